//! Subpackage boundary checks.
//!
//! A label such as `//a:b/c/foo.sh` names a file two directories below
//! package `a`. If `a/b` or `a/b/c` has a BUILD file of its own, that file
//! belongs to the nested package and the label is wrong, even when `a`
//! declares a target with that exact name.
//!
//! The check uses `PACKAGE_LOOKUP` nodes only, so nested packages are never
//! parsed, and every candidate is requested in one batch.

use tracing::debug;

use crate::engine::{Environment, NodeError, NodeKey};
use crate::label::Label;
use crate::loader::PackageLookupValue;

use super::error::ResolveError;

/// Result of a boundary check that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCheck {
  /// No prefix of the target name is a package.
  Clear,
  /// Some lookups are not computed yet; the caller should restart.
  Pending,
}

/// Check `label` against every candidate subpackage, shortest first.
///
/// Results that are already available decide the outcome even while other
/// lookups are still missing, so a failed lookup is reported as this label's
/// own error instead of waiting on siblings that may never run.
pub fn check_boundaries(label: &Label, env: &mut Environment<'_>) -> Result<BoundaryCheck, ResolveError> {
  let candidates: Vec<Label> = label.candidate_subpackages().collect();
  if candidates.is_empty() {
    return Ok(BoundaryCheck::Clear);
  }

  let results = env.get_values(candidates.iter().map(|moved| NodeKey::PackageLookup(moved.package().clone())));

  let mut pending = false;
  for (suggestion, (_, result)) in candidates.into_iter().zip(results) {
    match result {
      Some(Ok(value)) => {
        if value.as_package_lookup().is_some_and(PackageLookupValue::package_exists) {
          let subpackage = suggestion.package().clone();
          debug!(label = %label, subpackage = %subpackage, "label crosses package boundary");
          return Err(ResolveError::BoundaryCrossing {
            label: label.clone(),
            subpackage,
            suggestion,
          });
        }
      }
      Some(Err(info)) => {
        let cause = match info.error() {
          NodeError::Load(failure) => failure.detail(),
          other => other.to_string(),
        };
        return Err(ResolveError::TransitiveLoadFailure {
          label: label.clone(),
          package: suggestion.package().clone(),
          cause,
        });
      }
      None => pending = true,
    }
  }

  Ok(if pending { BoundaryCheck::Pending } else { BoundaryCheck::Clear })
}
