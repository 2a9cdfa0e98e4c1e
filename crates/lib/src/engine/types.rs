//! Error and result types for graph evaluation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::loader::LoadFailure;
use crate::marker::ResolveError;

use super::key::{NodeKey, NodeKind, NodeValue};

/// Failure payload of a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
  /// Raised by the file, package lookup and package functions.
  #[error(transparent)]
  Load(#[from] LoadFailure),

  /// Raised by label resolution.
  #[error(transparent)]
  Resolve(#[from] ResolveError),

  /// The listed keys waited on each other and none could finish.
  #[error("dependency cycle detected among: {}", join_keys(.0))]
  Cycle(Vec<NodeKey>),

  /// A node function broke the evaluation protocol.
  #[error("internal evaluation error: {0}")]
  Internal(String),
}

impl NodeError {
  pub(crate) fn unexpected_value(key: &NodeKey, dep: &NodeKey) -> Self {
    NodeError::Internal(format!("{} received a value of the wrong kind for {}", key, dep))
  }

  pub(crate) fn unexpected_key(key: &NodeKey, expected: NodeKind) -> Self {
    NodeError::Internal(format!("{} function invoked for {}", expected, key))
  }
}

fn join_keys(keys: &[NodeKey]) -> String {
  keys.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// An error recorded against a key, together with the keys it is attributed to.
///
/// A node function that returns its own error is the root cause of that
/// error. Only when an error is carried up unchanged (fail-fast bubbling) do
/// the root causes point below the reporting key.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
  root_causes: Vec<NodeKey>,
  error: Arc<NodeError>,
}

impl ErrorInfo {
  pub(crate) fn from_node(key: &NodeKey, error: NodeError) -> Self {
    Self {
      root_causes: vec![key.clone()],
      error: Arc::new(error),
    }
  }

  pub fn root_causes(&self) -> &[NodeKey] {
    &self.root_causes
  }

  pub fn error(&self) -> &NodeError {
    &self.error
  }
}

impl fmt::Display for ErrorInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.error.fmt(f)
  }
}

/// Errors setting up an evaluator.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("failed to start evaluation thread pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Counters for one call to [`super::Evaluator::evaluate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStats {
  /// Nodes finished per kind, with a value or an error.
  pub computed: BTreeMap<NodeKind, usize>,
  /// Invocations that ended waiting on missing dependencies.
  pub restarts: usize,
  /// Requested keys answered straight from the cache.
  pub cache_hits: usize,
  /// Number of parallel waves run.
  pub waves: usize,
}

impl EvaluationStats {
  pub fn computed(&self, kind: NodeKind) -> usize {
    self.computed.get(&kind).copied().unwrap_or(0)
  }

  pub fn total_computed(&self) -> usize {
    self.computed.values().sum()
  }
}

/// Outcome of evaluating a set of requested keys.
///
/// Each requested key ends up with either a value or an error, except keys
/// abandoned by a fail-fast evaluation, which have neither.
#[derive(Debug, Default)]
pub struct EvaluationResult {
  pub(crate) values: BTreeMap<NodeKey, NodeValue>,
  pub(crate) errors: BTreeMap<NodeKey, ErrorInfo>,
  pub(crate) stats: EvaluationStats,
}

impl EvaluationResult {
  pub fn has_error(&self) -> bool {
    !self.errors.is_empty()
  }

  pub fn get(&self, key: &NodeKey) -> Option<&NodeValue> {
    self.values.get(key)
  }

  pub fn error(&self, key: &NodeKey) -> Option<&ErrorInfo> {
    self.errors.get(key)
  }

  pub fn values(&self) -> impl Iterator<Item = (&NodeKey, &NodeValue)> {
    self.values.iter()
  }

  pub fn errors(&self) -> impl Iterator<Item = (&NodeKey, &ErrorInfo)> {
    self.errors.iter()
  }

  pub fn stats(&self) -> &EvaluationStats {
    &self.stats
  }
}
