//! `PACKAGE_LOOKUP` nodes: does a package have a BUILD file, and where.
//!
//! This is the cheap, existence-only query used by boundary checks. It stats
//! candidate BUILD files but never reads or parses them.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::config::EvaluatorConfig;
use crate::consts::DELETED_PACKAGE_REASON;
use crate::engine::{Environment, NodeError, NodeFunction, NodeKey, NodeKind, NodeValue};
use crate::label::PackageId;

use super::types::{LoadFailure, PackageLookupValue};

pub struct PackageLookupFunction {
  roots: Vec<PathBuf>,
  build_file_name: String,
  deleted: BTreeSet<PackageId>,
}

impl PackageLookupFunction {
  pub fn new(config: &EvaluatorConfig) -> Self {
    Self {
      roots: config.package_path.clone(),
      build_file_name: config.build_file_name.clone(),
      deleted: config.deleted_packages.clone(),
    }
  }
}

impl NodeFunction for PackageLookupFunction {
  fn compute(&self, key: &NodeKey, env: &mut Environment<'_>) -> Result<Option<NodeValue>, NodeError> {
    let NodeKey::PackageLookup(id) = key else {
      return Err(NodeError::unexpected_key(key, NodeKind::PackageLookup));
    };

    if self.deleted.contains(id) {
      return Ok(Some(NodeValue::PackageLookup(PackageLookupValue::NotFound {
        reason: DELETED_PACKAGE_REASON.to_string(),
      })));
    }

    let rel = id.to_path().join(&self.build_file_name);
    let candidates = env.get_values(self.roots.iter().map(|root| NodeKey::File(root.join(&rel))));
    if env.values_missing() {
      return Ok(None);
    }

    // Roots are searched in order; the first hit or the first failure wins.
    for (root, (dep, result)) in self.roots.iter().zip(candidates) {
      let NodeKey::File(path) = &dep else {
        return Err(NodeError::unexpected_key(&dep, NodeKind::File));
      };
      match result {
        Some(Ok(value)) => {
          let file = value.as_file().ok_or_else(|| NodeError::unexpected_value(key, &dep))?;
          if file.is_file() {
            debug!(package = %id, build_file = %path.display(), "found package");
            return Ok(Some(NodeValue::PackageLookup(PackageLookupValue::Found {
              root: root.clone(),
              build_file: path.clone(),
            })));
          }
          if file.exists() {
            debug!(package = %id, path = %path.display(), "BUILD path is not a regular file");
          }
        }
        Some(Err(info)) => {
          let message = match info.error() {
            NodeError::Load(failure) => failure.detail(),
            other => other.to_string(),
          };
          return Err(
            LoadFailure::Io {
              package: id.clone(),
              path: path.clone(),
              message,
            }
            .into(),
          );
        }
        None => return Ok(None),
      }
    }

    Ok(Some(NodeValue::PackageLookup(PackageLookupValue::NotFound {
      reason: format!("BUILD file not found on package path for '{}'", id),
    })))
  }
}
