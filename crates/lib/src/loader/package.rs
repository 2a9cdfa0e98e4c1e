//! `PACKAGE` nodes: read, parse and construct a package.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::{Environment, NodeError, NodeFunction, NodeKey, NodeKind, NodeValue};
use crate::vfs::FileSystem;

use super::build_file::{BuildFile, construct_package};
use super::types::{LoadFailure, PackageLookupValue};

pub struct PackageFunction {
  fs: Arc<dyn FileSystem>,
}

impl PackageFunction {
  pub fn new(fs: Arc<dyn FileSystem>) -> Self {
    Self { fs }
  }
}

impl NodeFunction for PackageFunction {
  fn compute(&self, key: &NodeKey, env: &mut Environment<'_>) -> Result<Option<NodeValue>, NodeError> {
    let NodeKey::Package(id) = key else {
      return Err(NodeError::unexpected_key(key, NodeKind::Package));
    };

    let lookup_key = NodeKey::PackageLookup(id.clone());
    let lookup = match env.get_value(lookup_key.clone()) {
      None => return Ok(None),
      Some(Err(info)) => return Err(info.error().clone()),
      Some(Ok(value)) => value,
    };
    let build_file = match lookup.as_package_lookup() {
      Some(PackageLookupValue::Found { build_file, .. }) => build_file.clone(),
      Some(PackageLookupValue::NotFound { reason }) => {
        return Err(
          LoadFailure::NoBuildFile {
            package: id.clone(),
            reason: reason.clone(),
          }
          .into(),
        );
      }
      None => return Err(NodeError::unexpected_value(key, &lookup_key)),
    };

    // Depend on the BUILD file itself so edits to it invalidate the package.
    match env.get_value(NodeKey::File(build_file.clone())) {
      None => return Ok(None),
      Some(Err(info)) => return Err(info.error().clone()),
      Some(Ok(_)) => {}
    }

    let contents = self.fs.read_to_string(&build_file).map_err(|e| LoadFailure::Io {
      package: id.clone(),
      path: build_file.clone(),
      message: e.to_string(),
    })?;
    let decl = BuildFile::parse(&contents).map_err(|e| LoadFailure::Parse {
      package: id.clone(),
      path: build_file.clone(),
      message: e.message().to_string(),
    })?;

    let package = construct_package(id.clone(), build_file, decl);
    for event in package.events() {
      warn!(package = %id, "{}", event);
    }
    debug!(
      package = %id,
      targets = package.targets().count(),
      in_error = package.contains_errors(),
      "loaded package"
    );

    Ok(Some(NodeValue::Package(Arc::new(package))))
  }
}
