//! Values produced by the loader node functions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::label::{Label, PackageId};
use crate::vfs::FileStatus;

/// Status of one absolute path, as seen by a `FILE` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValue {
  pub path: PathBuf,
  /// `None` when nothing exists at the path.
  pub status: Option<FileStatus>,
}

impl FileValue {
  pub fn exists(&self) -> bool {
    self.status.is_some()
  }

  pub fn is_file(&self) -> bool {
    self.status.as_ref().is_some_and(FileStatus::is_file)
  }
}

/// Outcome of an existence-only package query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLookupValue {
  /// The package's BUILD file lives under `root`.
  Found { root: PathBuf, build_file: PathBuf },
  NotFound { reason: String },
}

impl PackageLookupValue {
  pub fn package_exists(&self) -> bool {
    matches!(self, PackageLookupValue::Found { .. })
  }
}

/// Why a package could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadFailure {
  #[error("no such package '{package}': {reason}")]
  NoBuildFile { package: PackageId, reason: String },

  /// Reading or stat-ing something the package needs failed. The message is
  /// the underlying I/O error text.
  #[error("no such package '{package}': {message}")]
  Io {
    package: PackageId,
    path: PathBuf,
    message: String,
  },

  #[error("no such package '{package}': error parsing {}: {message}", path.display())]
  Parse {
    package: PackageId,
    path: PathBuf,
    message: String,
  },

  #[error("error accessing '{}': {message}", path.display())]
  FileAccess { path: PathBuf, message: String },
}

impl LoadFailure {
  pub fn package(&self) -> Option<&PackageId> {
    match self {
      LoadFailure::NoBuildFile { package, .. } | LoadFailure::Io { package, .. } | LoadFailure::Parse { package, .. } => {
        Some(package)
      }
      LoadFailure::FileAccess { .. } => None,
    }
  }

  /// The failure text without the `no such package` prefix.
  pub fn detail(&self) -> String {
    match self {
      LoadFailure::NoBuildFile { reason, .. } => reason.clone(),
      LoadFailure::Io { message, .. } | LoadFailure::FileAccess { message, .. } => message.clone(),
      LoadFailure::Parse { path, message, .. } => format!("error parsing {}: {}", path.display(), message),
    }
  }
}

/// A rule declared in a BUILD file, after label resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
  pub rule_class: String,
  pub srcs: Vec<Label>,
  pub outs: Vec<String>,
  pub deps: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
  Rule(Rule),
  InputFile,
  OutputFile { generating_rule: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
  pub name: String,
  #[serde(flatten)]
  pub kind: TargetKind,
  pub in_error: bool,
}

impl Target {
  /// Short human description, e.g. `sh_library rule` or `source file`.
  pub fn description(&self) -> String {
    match &self.kind {
      TargetKind::Rule(rule) => format!("{} rule", rule.rule_class),
      TargetKind::InputFile => "source file".to_string(),
      TargetKind::OutputFile { .. } => "generated file".to_string(),
    }
  }
}

/// A loaded package. Shared between consumers as `Arc<Package>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
  pub(crate) id: PackageId,
  pub(crate) build_file: PathBuf,
  pub(crate) targets: BTreeMap<String, Target>,
  pub(crate) in_error: bool,
  pub(crate) events: Vec<String>,
}

impl Package {
  pub fn id(&self) -> &PackageId {
    &self.id
  }

  pub fn build_file(&self) -> &PathBuf {
    &self.build_file
  }

  pub fn target(&self, name: &str) -> Option<&Target> {
    self.targets.get(name)
  }

  pub fn targets(&self) -> impl Iterator<Item = &Target> {
    self.targets.values()
  }

  /// Whether any error was recorded while constructing the package.
  pub fn contains_errors(&self) -> bool {
    self.in_error
  }

  /// Errors recorded while constructing the package, in declaration order.
  pub fn events(&self) -> &[String] {
    &self.events
  }
}
