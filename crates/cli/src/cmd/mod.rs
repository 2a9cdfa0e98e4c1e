mod resolve;
mod targets;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use buildmark_lib::config::EvaluatorConfig;
use buildmark_lib::engine::Evaluator;
use buildmark_lib::vfs::OsFileSystem;

pub use resolve::cmd_resolve;
pub use targets::cmd_targets;

/// Load the workspace configuration and build an evaluator over the real file system.
fn open_workspace(workspace: &Path) -> Result<(EvaluatorConfig, Evaluator)> {
  let config = EvaluatorConfig::load(workspace)
    .with_context(|| format!("Failed to load configuration for {}", workspace.display()))?;
  let evaluator = Evaluator::new(Arc::new(OsFileSystem), &config)?;
  Ok((config, evaluator))
}
