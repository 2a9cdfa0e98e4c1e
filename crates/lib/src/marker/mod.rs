//! Label resolution: `TARGET_MARKER` nodes.
//!
//! Resolving a label walks these steps, restarting whenever a dependency is
//! not computed yet:
//!
//! 1. Load the owning package. Failures become [`ResolveError::BuildUnitNotFound`]
//!    or [`ResolveError::TransitiveLoadFailure`].
//! 2. Check subpackage boundaries (see [`boundary`]). A crossing wins over
//!    anything the target lookup would report.
//! 3. Look the target up. A target in a package that is in error is itself
//!    unusable, even if the target on its own is fine.

pub mod boundary;
mod error;

use std::sync::Arc;

use crate::engine::{Environment, NodeError, NodeFunction, NodeKey, NodeKind, NodeValue};
use crate::label::Label;
use crate::loader::{Package, Target};

pub use boundary::{BoundaryCheck, check_boundaries};
pub use error::ResolveError;

/// Key resolving `label`.
pub fn key(label: Label) -> NodeKey {
  NodeKey::TargetMarker(label)
}

/// A label that resolved to a healthy target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetMarkerValue {
  label: Label,
  package: Arc<Package>,
  target: Target,
}

impl TargetMarkerValue {
  pub fn label(&self) -> &Label {
    &self.label
  }

  /// The cached package the target was found in.
  pub fn package(&self) -> &Arc<Package> {
    &self.package
  }

  pub fn target(&self) -> &Target {
    &self.target
  }
}

pub struct TargetMarkerFunction;

impl NodeFunction for TargetMarkerFunction {
  fn compute(&self, key: &NodeKey, env: &mut Environment<'_>) -> Result<Option<NodeValue>, NodeError> {
    let NodeKey::TargetMarker(label) = key else {
      return Err(NodeError::unexpected_key(key, NodeKind::TargetMarker));
    };

    let package_key = NodeKey::Package(label.package().clone());
    let package = match env.get_value(package_key.clone()) {
      None => return Ok(None),
      Some(Err(info)) => return Err(ResolveError::from_load(label, info.error()).into()),
      Some(Ok(value)) => value
        .as_package()
        .cloned()
        .ok_or_else(|| NodeError::unexpected_value(key, &package_key))?,
    };

    if check_boundaries(label, env)? == BoundaryCheck::Pending {
      return Ok(None);
    }

    let Some(target) = package.target(label.name()) else {
      return Err(
        ResolveError::TargetNotFound {
          label: label.clone(),
          build_file: package.build_file().clone(),
        }
        .into(),
      );
    };
    if target.in_error || package.contains_errors() {
      return Err(ResolveError::TargetInError { label: label.clone() }.into());
    }

    let target = target.clone();
    Ok(Some(NodeValue::TargetMarker(TargetMarkerValue {
      label: label.clone(),
      package,
      target,
    })))
  }
}
