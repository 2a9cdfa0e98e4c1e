//! Node identities and the values they produce.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::label::{Label, PackageId};
use crate::loader::{FileValue, Package, PackageLookupValue};
use crate::marker::TargetMarkerValue;

/// The kind of computation a [`NodeKey`] names. Node functions are
/// registered per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKind {
  File,
  PackageLookup,
  Package,
  TargetMarker,
}

impl NodeKind {
  pub fn as_str(self) -> &'static str {
    match self {
      NodeKind::File => "FILE",
      NodeKind::PackageLookup => "PACKAGE_LOOKUP",
      NodeKind::Package => "PACKAGE",
      NodeKind::TargetMarker => "TARGET_MARKER",
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Identity of a node in the evaluation graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeKey {
  /// Status of an absolute path.
  File(PathBuf),
  /// Whether a package has a BUILD file, without parsing it.
  PackageLookup(PackageId),
  /// A fully loaded package.
  Package(PackageId),
  /// Resolution of a label to a target.
  TargetMarker(Label),
}

impl NodeKey {
  pub fn kind(&self) -> NodeKind {
    match self {
      NodeKey::File(_) => NodeKind::File,
      NodeKey::PackageLookup(_) => NodeKind::PackageLookup,
      NodeKey::Package(_) => NodeKind::Package,
      NodeKey::TargetMarker(_) => NodeKind::TargetMarker,
    }
  }
}

impl fmt::Display for NodeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeKey::File(path) => write!(f, "{}:{}", self.kind(), path.display()),
      NodeKey::PackageLookup(id) | NodeKey::Package(id) => write!(f, "{}:{}", self.kind(), id),
      NodeKey::TargetMarker(label) => write!(f, "{}:{}", self.kind(), label),
    }
  }
}

/// A successfully computed node value. Cloning is cheap.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
  File(FileValue),
  PackageLookup(PackageLookupValue),
  Package(Arc<Package>),
  TargetMarker(TargetMarkerValue),
}

impl NodeValue {
  pub fn as_file(&self) -> Option<&FileValue> {
    match self {
      NodeValue::File(value) => Some(value),
      _ => None,
    }
  }

  pub fn as_package_lookup(&self) -> Option<&PackageLookupValue> {
    match self {
      NodeValue::PackageLookup(value) => Some(value),
      _ => None,
    }
  }

  pub fn as_package(&self) -> Option<&Arc<Package>> {
    match self {
      NodeValue::Package(value) => Some(value),
      _ => None,
    }
  }

  pub fn as_target_marker(&self) -> Option<&TargetMarkerValue> {
    match self {
      NodeValue::TargetMarker(value) => Some(value),
      _ => None,
    }
  }
}
