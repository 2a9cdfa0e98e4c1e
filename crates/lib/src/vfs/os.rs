use std::fs;
use std::io;
use std::path::Path;

use super::{FileStatus, FileSystem};

/// The real file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
  fn stat(&self, path: &Path, follow_symlinks: bool) -> io::Result<FileStatus> {
    let meta = if follow_symlinks {
      fs::metadata(path)?
    } else {
      fs::symlink_metadata(path)?
    };
    Ok(FileStatus::from(&meta))
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
  }
}
