//! Shared helpers for library integration tests.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use buildmark_lib::config::EvaluatorConfig;
use buildmark_lib::engine::{EvaluationResult, Evaluator, NodeError, NodeKey};
use buildmark_lib::label::Label;
use buildmark_lib::marker::{self, ResolveError, TargetMarkerValue};
use buildmark_lib::vfs::{FileStatus, FileSystem, InMemoryFileSystem, ModifiedFileSet};

pub const WS: &str = "/ws";

/// In-memory file system that counts how often it is used.
#[derive(Debug, Default)]
pub struct CountingFileSystem {
  pub inner: InMemoryFileSystem,
  stats: AtomicUsize,
  reads: AtomicUsize,
}

impl CountingFileSystem {
  pub fn stats(&self) -> usize {
    self.stats.load(Ordering::SeqCst)
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }
}

impl FileSystem for CountingFileSystem {
  fn stat(&self, path: &Path, follow_symlinks: bool) -> io::Result<FileStatus> {
    self.stats.fetch_add(1, Ordering::SeqCst);
    self.inner.stat(path, follow_symlinks)
  }

  fn read_to_string(&self, path: &Path) -> io::Result<String> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    self.inner.read_to_string(path)
  }
}

/// An evaluator over an in-memory workspace rooted at [`WS`].
pub struct TestWorkspace {
  pub fs: Arc<CountingFileSystem>,
  pub evaluator: Evaluator,
}

impl TestWorkspace {
  pub fn new() -> Self {
    Self::with_config(EvaluatorConfig::for_workspace(WS))
  }

  pub fn with_config(config: EvaluatorConfig) -> Self {
    let fs = Arc::new(CountingFileSystem::default());
    let evaluator = Evaluator::new(fs.clone(), &config).unwrap();
    Self { fs, evaluator }
  }

  pub fn path(rel: &str) -> PathBuf {
    Path::new(WS).join(rel)
  }

  /// Write a file relative to the workspace root.
  pub fn write(&self, rel: &str, contents: &str) {
    self.fs.inner.write_file(Self::path(rel), contents);
  }

  pub fn remove(&self, rel: &str) {
    self.fs.inner.remove(Self::path(rel));
  }

  pub fn fail_stat(&self, rel: &str, message: &str) {
    self.fs.inner.stub_stat_error(Self::path(rel), io::Error::other(message.to_string()));
  }

  pub fn invalidate(&mut self, rels: &[&str]) -> BTreeSet<NodeKey> {
    let modified = rels
      .iter()
      .fold(ModifiedFileSet::builder(), |builder, rel| builder.modify(*rel))
      .build();
    self.evaluator.invalidate(&modified)
  }

  pub fn evaluate(&mut self, labels: &[&str], keep_going: bool) -> EvaluationResult {
    let keys: Vec<NodeKey> = labels.iter().map(|label| key(label)).collect();
    self.evaluator.evaluate(&keys, keep_going)
  }

  pub fn resolve(&mut self, label: &str) -> Result<TargetMarkerValue, ResolveError> {
    let result = self.evaluate(&[label], false);
    marker_outcome(&result, label)
  }
}

pub fn key(label: &str) -> NodeKey {
  marker::key(Label::parse(label).unwrap())
}

/// The value or classified error recorded for `label` in `result`.
pub fn marker_outcome(result: &EvaluationResult, label: &str) -> Result<TargetMarkerValue, ResolveError> {
  let key = key(label);
  if let Some(value) = result.get(&key) {
    return Ok(value.as_target_marker().unwrap().clone());
  }
  let info = result
    .error(&key)
    .unwrap_or_else(|| panic!("no outcome recorded for {}", label));
  match info.error() {
    NodeError::Resolve(err) => Err(err.clone()),
    other => panic!("{} failed with an unclassified error: {}", label, other),
  }
}

/// `a/BUILD` declaring `foo` with source `b/c/foo.sh`.
pub const FOO_BUILD: &str = r#"
[[rule]]
kind = "sh_library"
name = "foo"
srcs = ["b/c/foo.sh"]
"#;
