//! `FILE` nodes: the status of one absolute path.

use std::sync::Arc;

use tracing::trace;

use crate::engine::{Environment, NodeError, NodeFunction, NodeKey, NodeKind, NodeValue};
use crate::vfs::FileSystem;

use super::types::{FileValue, LoadFailure};

/// Stats a path, following symlinks. A missing path is a value, not an error.
pub struct FileFunction {
  fs: Arc<dyn FileSystem>,
}

impl FileFunction {
  pub fn new(fs: Arc<dyn FileSystem>) -> Self {
    Self { fs }
  }
}

impl NodeFunction for FileFunction {
  fn compute(&self, key: &NodeKey, _env: &mut Environment<'_>) -> Result<Option<NodeValue>, NodeError> {
    let NodeKey::File(path) = key else {
      return Err(NodeError::unexpected_key(key, NodeKind::File));
    };

    let status = self.fs.stat_if_found(path, true).map_err(|e| LoadFailure::FileAccess {
      path: path.clone(),
      message: e.to_string(),
    })?;
    trace!(path = %path.display(), exists = status.is_some(), "stat");

    Ok(Some(NodeValue::File(FileValue {
      path: path.clone(),
      status,
    })))
  }
}
