//! Package loading as graph nodes.
//!
//! Three node kinds live here:
//! - `FILE`: stat of one absolute path ([`FileFunction`])
//! - `PACKAGE_LOOKUP`: existence-only package query over the package path
//!   ([`PackageLookupFunction`])
//! - `PACKAGE`: the parsed and constructed [`Package`] ([`PackageFunction`])
//!
//! Every file a package or lookup looks at is a declared `FILE` dependency,
//! which is what lets invalidation find them later.

mod build_file;
mod file;
mod lookup;
mod package;
mod types;

pub use build_file::{BuildFile, RuleDecl};
pub use file::FileFunction;
pub use lookup::PackageLookupFunction;
pub use package::PackageFunction;
pub use types::{FileValue, LoadFailure, Package, PackageLookupValue, Rule, Target, TargetKind};
