//! Memoized node entries and their reverse dependencies.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{Dfs, EdgeRef};

use super::key::{NodeKey, NodeValue};
use super::types::ErrorInfo;

/// A finished node: its outcome and the dependencies it declared.
#[derive(Debug, Clone)]
pub(crate) struct NodeEntry {
  pub result: Result<NodeValue, ErrorInfo>,
  pub deps: Vec<NodeKey>,
}

/// Cache of finished nodes.
///
/// Alongside the entries, a graph with one edge per declared dependency,
/// pointing from the dependency to the node that requested it, so that
/// invalidation is a reachability walk from the changed files.
#[derive(Debug, Default)]
pub(crate) struct NodeGraph {
  entries: HashMap<NodeKey, NodeEntry>,
  rdeps: StableDiGraph<NodeKey, ()>,
  indices: HashMap<NodeKey, NodeIndex>,
}

impl NodeGraph {
  pub fn get(&self, key: &NodeKey) -> Option<&NodeEntry> {
    self.entries.get(key)
  }

  pub fn contains(&self, key: &NodeKey) -> bool {
    self.entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  fn index_of(&mut self, key: &NodeKey) -> NodeIndex {
    if let Some(&idx) = self.indices.get(key) {
      return idx;
    }
    let idx = self.rdeps.add_node(key.clone());
    self.indices.insert(key.clone(), idx);
    idx
  }

  pub fn insert(&mut self, key: NodeKey, entry: NodeEntry) {
    let idx = self.index_of(&key);
    for dep in &entry.deps {
      let dep_idx = self.index_of(dep);
      self.rdeps.update_edge(dep_idx, idx, ());
    }
    self.entries.insert(key, entry);
  }

  /// Evict every `FILE` node at or below one of `dirty`, and everything that
  /// transitively depends on them. Returns the evicted keys.
  pub fn invalidate_paths(&mut self, dirty: &[PathBuf]) -> BTreeSet<NodeKey> {
    let starts: Vec<NodeIndex> = self
      .indices
      .iter()
      .filter(|(key, _)| match key {
        NodeKey::File(path) => dirty.iter().any(|d| path.starts_with(d)),
        _ => false,
      })
      .map(|(_, &idx)| idx)
      .collect();

    let mut reached = Vec::new();
    let mut dfs = Dfs::empty(&self.rdeps);
    for start in starts {
      dfs.move_to(start);
      while let Some(idx) = dfs.next(&self.rdeps) {
        reached.push(idx);
      }
    }

    let mut evicted = BTreeSet::new();
    let mut touched = Vec::new();
    for &idx in &reached {
      // The node re-declares its dependencies when it is recomputed.
      let incoming: Vec<_> = self
        .rdeps
        .edges_directed(idx, Direction::Incoming)
        .map(|edge| (edge.id(), edge.source()))
        .collect();
      for (edge, dep) in incoming {
        self.rdeps.remove_edge(edge);
        touched.push(dep);
      }

      let key = &self.rdeps[idx];
      if self.entries.remove(key).is_some() {
        evicted.insert(key.clone());
      }
    }

    // Uncached keys with no edges left are unreachable from any future walk.
    for idx in reached.into_iter().chain(touched) {
      let orphan = self.rdeps.node_weight(idx).is_some_and(|key| !self.entries.contains_key(key))
        && self.rdeps.neighbors_undirected(idx).next().is_none();
      if orphan {
        if let Some(key) = self.rdeps.remove_node(idx) {
          self.indices.remove(&key);
        }
      }
    }
    evicted
  }

  /// Number of keys tracked by the dependency graph.
  #[cfg(test)]
  fn tracked(&self) -> usize {
    self.rdeps.node_count()
  }

  /// Drop everything. Returns the evicted keys.
  pub fn clear(&mut self) -> BTreeSet<NodeKey> {
    let evicted = self.entries.drain().map(|(key, _)| key).collect();
    self.rdeps.clear();
    self.indices.clear();
    evicted
  }
}
