//! buildmark-lib: incremental label resolution over a build workspace.
//!
//! The crate is organised around a memoizing graph evaluator:
//! - [`label`]: package identifiers and target labels
//! - [`vfs`]: the file system seen by evaluation, on disk or in memory
//! - [`loader`]: BUILD file lookup, parsing and package construction
//! - [`marker`]: resolving a label to a target, with classified failures
//! - [`engine`]: the evaluator that schedules, caches and invalidates nodes
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use buildmark_lib::config::EvaluatorConfig;
//! use buildmark_lib::engine::Evaluator;
//! use buildmark_lib::label::Label;
//! use buildmark_lib::vfs::OsFileSystem;
//!
//! let config = EvaluatorConfig::for_workspace("/path/to/workspace");
//! let mut evaluator = Evaluator::new(Arc::new(OsFileSystem), &config).unwrap();
//! let key = buildmark_lib::marker::key(Label::parse("//a:foo").unwrap());
//! let result = evaluator.evaluate(&[key], false);
//! ```

pub mod config;
pub mod consts;
pub mod engine;
pub mod label;
pub mod loader;
pub mod marker;
pub mod vfs;
