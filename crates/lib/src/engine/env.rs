//! The view a node function has of the graph while it runs.

use std::collections::HashMap;

use super::graph::NodeGraph;
use super::key::{NodeKey, NodeValue};
use super::types::ErrorInfo;

/// Dependency access for a running node function.
///
/// Every key asked for is recorded as a dependency of the running node. Keys
/// that are not finished yet come back as `None` and mark the environment as
/// having missing values; the function should then return `Ok(None)` and
/// will be run again once they are done.
pub struct Environment<'a> {
  graph: &'a NodeGraph,
  uncommitted: &'a HashMap<NodeKey, ErrorInfo>,
  deps: Vec<NodeKey>,
  missing: Vec<NodeKey>,
  saw_uncommitted: bool,
}

impl<'a> Environment<'a> {
  pub(crate) fn new(graph: &'a NodeGraph, uncommitted: &'a HashMap<NodeKey, ErrorInfo>) -> Self {
    Self {
      graph,
      uncommitted,
      deps: Vec::new(),
      missing: Vec::new(),
      saw_uncommitted: false,
    }
  }

  /// Request a single dependency.
  pub fn get_value(&mut self, key: NodeKey) -> Option<Result<NodeValue, ErrorInfo>> {
    let found = match self.graph.get(&key) {
      Some(entry) => Some(entry.result.clone()),
      None => self.uncommitted.get(&key).cloned().map(|info| {
        self.saw_uncommitted = true;
        Err(info)
      }),
    };

    if found.is_none() && !self.missing.contains(&key) {
      self.missing.push(key.clone());
    }
    if !self.deps.contains(&key) {
      self.deps.push(key);
    }
    found
  }

  /// Request several dependencies at once, so that all missing ones are
  /// scheduled in the same wave. Results come back in request order.
  pub fn get_values(
    &mut self,
    keys: impl IntoIterator<Item = NodeKey>,
  ) -> Vec<(NodeKey, Option<Result<NodeValue, ErrorInfo>>)> {
    keys
      .into_iter()
      .map(|key| {
        let result = self.get_value(key.clone());
        (key, result)
      })
      .collect()
  }

  /// Whether any requested dependency is not available yet.
  pub fn values_missing(&self) -> bool {
    !self.missing.is_empty()
  }

  /// Declared dependencies, missing dependencies, and whether an
  /// uncommitted error was observed.
  pub(crate) fn finish(self) -> (Vec<NodeKey>, Vec<NodeKey>, bool) {
    (self.deps, self.missing, self.saw_uncommitted)
  }
}
