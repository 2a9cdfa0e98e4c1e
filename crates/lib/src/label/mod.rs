//! Package identifiers and target labels.
//!
//! A [`PackageId`] names a package by its workspace-relative directory
//! (`a/b`, or the empty string for the root package). A [`Label`] pairs a
//! package with a target name and is written `//a/b:name`.
//!
//! Target names may contain `/` to name files in subdirectories of the
//! package (`//a:b/c/foo.sh`). Whether such a name reaches into a nested
//! package is not a syntactic property: see [`crate::marker::boundary`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while parsing package names and labels.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
  /// The label does not start with `//`.
  #[error("invalid label '{0}': absolute label must begin with '//'")]
  NotAbsolute(String),

  /// `@repo//...` labels are outside of what this workspace understands.
  #[error("invalid label '{0}': repository-qualified labels are not supported")]
  Repository(String),

  /// The package part is malformed.
  #[error("invalid package name '{input}': {reason}")]
  InvalidPackage { input: String, reason: String },

  /// The target part is malformed.
  #[error("invalid target name '{input}': {reason}")]
  InvalidTarget { input: String, reason: String },
}

/// Canonical, workspace-relative path of a package directory.
///
/// Invariant: no leading or trailing `/`, and no empty, `.` or `..`
/// segments. The empty id is the root package.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId(String);

impl PackageId {
  /// Parse and validate a package name such as `a/b`.
  pub fn parse(input: &str) -> Result<Self, LabelError> {
    validate_package(input)?;
    Ok(Self(input.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }

  /// Relative directory of this package under a package path root.
  pub fn to_path(&self) -> PathBuf {
    self.0.split('/').filter(|s| !s.is_empty()).collect()
  }

  /// Package id of `relative` nested below this package.
  ///
  /// Callers pass segments that already passed target-name validation, which
  /// is at least as strict as package-name validation.
  fn nested(&self, relative: &str) -> PackageId {
    if self.is_root() {
      PackageId(relative.to_string())
    } else {
      PackageId(format!("{}/{}", self.0, relative))
    }
  }
}

impl fmt::Display for PackageId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for PackageId {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for PackageId {
  type Error = LabelError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    validate_package(&value)?;
    Ok(Self(value))
  }
}

impl From<PackageId> for String {
  fn from(id: PackageId) -> Self {
    id.0
  }
}

/// A fully-qualified reference to a target: `//<package>:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
  package: PackageId,
  name: String,
}

impl Label {
  /// Build a label from already-separated parts.
  pub fn new(package: PackageId, name: &str) -> Result<Self, LabelError> {
    validate_target(name)?;
    Ok(Self {
      package,
      name: name.to_string(),
    })
  }

  /// Parse an absolute label.
  ///
  /// Accepted forms are `//pkg:name`, `//pkg` (short for `//pkg:<last segment>`)
  /// and `//:name` for targets of the root package.
  pub fn parse(input: &str) -> Result<Self, LabelError> {
    if input.starts_with('@') {
      return Err(LabelError::Repository(input.to_string()));
    }
    let Some(rest) = input.strip_prefix("//") else {
      return Err(LabelError::NotAbsolute(input.to_string()));
    };

    let (package, name) = match rest.split_once(':') {
      Some((package, name)) => (package, name),
      None => {
        let last = rest.rsplit('/').next().unwrap_or_default();
        (rest, last)
      }
    };

    let package = PackageId::parse(package)?;
    Self::new(package, name)
  }

  /// Parse a label that may be relative to `current`.
  ///
  /// `:name` and bare `name` resolve inside `current`; anything starting with
  /// `//` or `@` is parsed as absolute.
  pub fn parse_relative(input: &str, current: &PackageId) -> Result<Self, LabelError> {
    if input.starts_with("//") || input.starts_with('@') {
      return Self::parse(input);
    }
    let name = input.strip_prefix(':').unwrap_or(input);
    Self::new(current.clone(), name)
  }

  pub fn package(&self) -> &PackageId {
    &self.package
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Strict `/`-prefixes of the target name, shortest first.
  ///
  /// `b/c/foo.sh` yields `b` and `b/c`; a name without `/` yields nothing.
  pub fn name_prefixes(&self) -> impl Iterator<Item = &str> + '_ {
    self.name.match_indices('/').map(move |(idx, _)| &self.name[..idx])
  }

  /// This label with the colon moved past each strict prefix of the name,
  /// shortest first.
  ///
  /// The package of each result is a subpackage that would own this label's
  /// file if its BUILD file existed: `//a:b/c/foo.sh` yields `//a/b:c/foo.sh`
  /// and `//a/b/c:foo.sh`.
  pub fn candidate_subpackages(&self) -> impl Iterator<Item = Label> + '_ {
    self.name_prefixes().map(move |prefix| Label {
      package: self.package.nested(prefix),
      name: self.name[prefix.len() + 1..].to_string(),
    })
  }
}

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "//{}:{}", self.package, self.name)
  }
}

impl FromStr for Label {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl TryFrom<String> for Label {
  type Error = LabelError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Self::parse(&value)
  }
}

impl From<Label> for String {
  fn from(label: Label) -> Self {
    label.to_string()
  }
}

fn validate_package(input: &str) -> Result<(), LabelError> {
  let invalid = |reason: &str| LabelError::InvalidPackage {
    input: input.to_string(),
    reason: reason.to_string(),
  };

  if input.is_empty() {
    return Ok(());
  }
  if input.starts_with('/') {
    return Err(invalid("package names may not start with '/'"));
  }
  if input.ends_with('/') {
    return Err(invalid("package names may not end with '/'"));
  }
  if let Some(c) = input.chars().find(|c| matches!(c, ':' | '\\') || c.is_control()) {
    return Err(invalid(&format!("package names may not contain {:?}", c)));
  }
  check_segments(input).map_err(invalid)
}

fn validate_target(input: &str) -> Result<(), LabelError> {
  let invalid = |reason: &str| LabelError::InvalidTarget {
    input: input.to_string(),
    reason: reason.to_string(),
  };

  if input.is_empty() {
    return Err(invalid("empty target name"));
  }
  if input.starts_with('/') {
    return Err(invalid("target names may not start with '/'"));
  }
  if input.ends_with('/') {
    return Err(invalid("target names may not end with '/'"));
  }
  if let Some(c) = input.chars().find(|c| matches!(c, ':' | '\\') || c.is_control()) {
    return Err(invalid(&format!("target names may not contain {:?}", c)));
  }
  check_segments(input).map_err(invalid)
}

fn check_segments(input: &str) -> Result<(), &'static str> {
  for segment in input.split('/') {
    match segment {
      "" => return Err("contains an empty path segment ('//')"),
      "." => return Err("contains a '.' path segment"),
      ".." => return Err("contains a '..' path segment"),
      _ => {}
    }
  }
  Ok(())
}
