//! File system abstraction used by package loading.
//!
//! Everything that reads workspace state goes through [`FileSystem`], so the
//! evaluator can run against the real disk ([`OsFileSystem`]) or against an
//! [`InMemoryFileSystem`] whose stat calls can be made to fail on demand.
//!
//! Changes between evaluations are reported with a [`ModifiedFileSet`].

mod memory;
mod os;

use std::collections::BTreeSet;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use memory::InMemoryFileSystem;
pub use os::OsFileSystem;

/// What kind of object a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
  File,
  Directory,
  Symlink,
  Other,
}

/// Result of a successful `stat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
  pub kind: FileKind,
  pub size: u64,
  pub modified: Option<SystemTime>,
}

impl FileStatus {
  pub fn is_file(&self) -> bool {
    self.kind == FileKind::File
  }

  pub fn is_directory(&self) -> bool {
    self.kind == FileKind::Directory
  }
}

impl From<&Metadata> for FileStatus {
  fn from(meta: &Metadata) -> Self {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
      FileKind::Symlink
    } else if file_type.is_dir() {
      FileKind::Directory
    } else if file_type.is_file() {
      FileKind::File
    } else {
      FileKind::Other
    };

    Self {
      kind,
      size: meta.len(),
      modified: meta.modified().ok(),
    }
  }
}

/// Read access to workspace files.
///
/// Implementations are shared between evaluation worker threads.
pub trait FileSystem: Send + Sync {
  /// Stat `path`, resolving symlinks when `follow_symlinks` is set.
  ///
  /// A missing path is reported as an error of kind [`io::ErrorKind::NotFound`].
  fn stat(&self, path: &Path, follow_symlinks: bool) -> io::Result<FileStatus>;

  /// Read the whole file at `path` as UTF-8.
  fn read_to_string(&self, path: &Path) -> io::Result<String>;

  /// Like [`FileSystem::stat`], but maps "not found" to `Ok(None)`.
  ///
  /// A path below a regular file (`ENOTDIR`) does not exist either.
  fn stat_if_found(&self, path: &Path, follow_symlinks: bool) -> io::Result<Option<FileStatus>> {
    match self.stat(path, follow_symlinks) {
      Ok(status) => Ok(Some(status)),
      Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => Ok(None),
      Err(e) => Err(e),
    }
  }
}

/// Workspace-relative paths that changed since the previous evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifiedFileSet {
  paths: BTreeSet<PathBuf>,
  everything: bool,
}

impl ModifiedFileSet {
  /// A set that invalidates every cached node.
  pub fn everything_modified() -> Self {
    Self {
      paths: BTreeSet::new(),
      everything: true,
    }
  }

  pub fn builder() -> ModifiedFileSetBuilder {
    ModifiedFileSetBuilder::default()
  }

  pub fn treat_everything_as_modified(&self) -> bool {
    self.everything
  }

  pub fn paths(&self) -> impl Iterator<Item = &Path> {
    self.paths.iter().map(PathBuf::as_path)
  }

  pub fn is_empty(&self) -> bool {
    !self.everything && self.paths.is_empty()
  }
}

#[derive(Debug, Default)]
pub struct ModifiedFileSetBuilder {
  paths: BTreeSet<PathBuf>,
}

impl ModifiedFileSetBuilder {
  /// Record a modified path, relative to the package path roots.
  pub fn modify(mut self, path: impl Into<PathBuf>) -> Self {
    self.paths.insert(path.into());
    self
  }

  pub fn build(self) -> ModifiedFileSet {
    ModifiedFileSet {
      paths: self.paths,
      everything: false,
    }
  }
}
