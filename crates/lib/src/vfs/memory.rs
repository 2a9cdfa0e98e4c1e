use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use super::{FileKind, FileStatus, FileSystem};

const MAX_SYMLINK_HOPS: usize = 32;

#[derive(Debug, Clone)]
enum Entry {
  File { contents: String, modified: SystemTime },
  Directory,
  Symlink(PathBuf),
}

#[derive(Debug, Default)]
struct State {
  entries: BTreeMap<PathBuf, Entry>,
  stat_errors: HashMap<PathBuf, (io::ErrorKind, String)>,
}

impl State {
  fn add_parents(&mut self, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
      if ancestor.as_os_str().is_empty() {
        break;
      }
      self.entries.entry(ancestor.to_path_buf()).or_insert(Entry::Directory);
    }
  }

  /// Find the entry for `path`, following symlinks at the final component
  /// when asked to. Intermediate components are matched literally.
  fn lookup(&self, path: &Path, follow_symlinks: bool) -> io::Result<&Entry> {
    let mut current = path.to_path_buf();
    for _ in 0..=MAX_SYMLINK_HOPS {
      let entry = self
        .entries
        .get(&current)
        .ok_or_else(|| not_found(&current))?;

      match entry {
        Entry::Symlink(target) if follow_symlinks => {
          current = match current.parent() {
            Some(parent) if target.is_relative() => normalize(&parent.join(target)),
            _ => target.clone(),
          };
        }
        _ => return Ok(entry),
      }
    }
    Err(io::Error::other(format!(
      "{}: too many levels of symbolic links",
      path.display()
    )))
  }
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::ParentDir => {
        out.pop();
      }
      Component::CurDir => {}
      other => out.push(other.as_os_str()),
    }
  }
  out
}

fn not_found(path: &Path) -> io::Error {
  io::Error::new(
    io::ErrorKind::NotFound,
    format!("{}: No such file or directory", path.display()),
  )
}

/// A [`FileSystem`] kept entirely in memory.
///
/// Parent directories are created implicitly. Any path can be made to fail
/// `stat` with a chosen error via [`InMemoryFileSystem::stub_stat_error`],
/// which is how tests exercise I/O failures deep inside package loading.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
  state: RwLock<State>,
}

impl InMemoryFileSystem {
  pub fn new() -> Self {
    Self::default()
  }

  fn read(&self) -> RwLockReadGuard<'_, State> {
    self.state.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, State> {
    self.state.write().unwrap_or_else(PoisonError::into_inner)
  }

  /// Create or replace a regular file.
  pub fn write_file(&self, path: impl AsRef<Path>, contents: &str) {
    let path = path.as_ref();
    let mut state = self.write();
    state.add_parents(path);
    state.entries.insert(
      path.to_path_buf(),
      Entry::File {
        contents: contents.to_string(),
        modified: SystemTime::now(),
      },
    );
  }

  pub fn create_dir_all(&self, path: impl AsRef<Path>) {
    let path = path.as_ref();
    let mut state = self.write();
    state.add_parents(path);
    state.entries.entry(path.to_path_buf()).or_insert(Entry::Directory);
  }

  /// Create a symlink at `link`. Relative targets resolve against the link's directory.
  pub fn symlink(&self, link: impl AsRef<Path>, target: impl Into<PathBuf>) {
    let link = link.as_ref();
    let mut state = self.write();
    state.add_parents(link);
    state.entries.insert(link.to_path_buf(), Entry::Symlink(target.into()));
  }

  /// Remove `path` and everything below it. Returns whether anything was removed.
  pub fn remove(&self, path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    let mut state = self.write();
    let before = state.entries.len();
    state.entries.retain(|p, _| !p.starts_with(path));
    state.entries.len() != before
  }

  /// Make every `stat` of exactly `path` fail with `error`'s kind and message.
  pub fn stub_stat_error(&self, path: impl Into<PathBuf>, error: io::Error) {
    let message = error.to_string();
    self.write().stat_errors.insert(path.into(), (error.kind(), message));
  }

  pub fn clear_stat_error(&self, path: impl AsRef<Path>) {
    self.write().stat_errors.remove(path.as_ref());
  }
}

impl FileSystem for InMemoryFileSystem {
  fn stat(&self, path: &Path, follow_symlinks: bool) -> io::Result<FileStatus> {
    let state = self.read();
    if let Some((kind, message)) = state.stat_errors.get(path) {
      return Err(io::Error::new(*kind, message.clone()));
    }

    let status = match state.lookup(path, follow_symlinks)? {
      Entry::File { contents, modified } => FileStatus {
        kind: FileKind::File,
        size: contents.len() as u64,
        modified: Some(*modified),
      },
      Entry::Directory => FileStatus {
        kind: FileKind::Directory,
        size: 0,
        modified: None,
      },
      Entry::Symlink(target) => FileStatus {
        kind: FileKind::Symlink,
        size: target.as_os_str().len() as u64,
        modified: None,
      },
    };
    Ok(status)
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    let state = self.read();
    match state.lookup(path, true)? {
      Entry::File { contents, .. } => Ok(contents.clone()),
      _ => Err(io::Error::other(format!("{}: not a regular file", path.display()))),
    }
  }
}
