use std::path::PathBuf;

use thiserror::Error;

use crate::engine::NodeError;
use crate::label::{Label, PackageId};
use crate::loader::LoadFailure;

/// Why a label does not resolve to a usable target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
  /// The owning package has no BUILD file.
  #[error("no such package '{package}': {reason}")]
  BuildUnitNotFound {
    label: Label,
    package: PackageId,
    reason: String,
  },

  /// A package the label depends on exists but could not be loaded. `cause`
  /// is the underlying failure text, unmodified.
  #[error("no such package '{package}': {cause}")]
  TransitiveLoadFailure {
    label: Label,
    package: PackageId,
    cause: String,
  },

  #[error(
    "no such target '{label}': Label '{label}' crosses boundary of subpackage '{subpackage}' \
     (perhaps you meant to put the colon here: '{suggestion}'?)"
  )]
  BoundaryCrossing {
    label: Label,
    subpackage: PackageId,
    suggestion: Label,
  },

  #[error(
    "no such target '{label}': target '{}' not declared in package '{}' defined by {}",
    label.name(),
    label.package(),
    build_file.display()
  )]
  TargetNotFound { label: Label, build_file: PathBuf },

  #[error("Target '{label}' contains an error and its package is in error")]
  TargetInError { label: Label },
}

impl ResolveError {
  /// The label whose resolution failed.
  pub fn label(&self) -> &Label {
    match self {
      ResolveError::BuildUnitNotFound { label, .. }
      | ResolveError::TransitiveLoadFailure { label, .. }
      | ResolveError::BoundaryCrossing { label, .. }
      | ResolveError::TargetNotFound { label, .. }
      | ResolveError::TargetInError { label } => label,
    }
  }

  /// The package the failure is about: the failing package for load
  /// failures, the nested package for boundary crossings, otherwise the
  /// label's own package.
  pub fn package(&self) -> &PackageId {
    match self {
      ResolveError::BuildUnitNotFound { package, .. } | ResolveError::TransitiveLoadFailure { package, .. } => package,
      ResolveError::BoundaryCrossing { subpackage, .. } => subpackage,
      ResolveError::TargetNotFound { label, .. } | ResolveError::TargetInError { label } => label.package(),
    }
  }

  /// Whether the target exists and was found, only unusable.
  pub fn has_target(&self) -> bool {
    matches!(self, ResolveError::TargetInError { .. })
  }

  /// Reclassify a failed package load as seen from `label`.
  pub(crate) fn from_load(label: &Label, error: &NodeError) -> Self {
    match error {
      NodeError::Load(LoadFailure::NoBuildFile { package, reason }) => ResolveError::BuildUnitNotFound {
        label: label.clone(),
        package: package.clone(),
        reason: reason.clone(),
      },
      NodeError::Load(failure) => ResolveError::TransitiveLoadFailure {
        label: label.clone(),
        package: failure.package().unwrap_or(label.package()).clone(),
        cause: failure.detail(),
      },
      other => ResolveError::TransitiveLoadFailure {
        label: label.clone(),
        package: label.package().clone(),
        cause: other.to_string(),
      },
    }
  }
}
