//! Demand-driven, memoizing graph evaluation.
//!
//! This module provides the [`Evaluator`], which computes [`NodeKey`]s by
//! running the [`NodeFunction`] registered for their [`NodeKind`]. It handles:
//! - Restartable node functions: a function asks its [`Environment`] for the
//!   values it depends on and returns `Ok(None)` if some are not ready yet
//! - Parallel waves: every key that is ready runs concurrently, against a
//!   read-only view of the cache, and results are committed after the wave
//! - Keep-going and fail-fast modes
//! - Memoization across calls, with path-driven invalidation
//!
//! # Evaluation Model
//!
//! 1. Requested keys that are cached are answered immediately
//! 2. The rest form the first wave
//! 3. A function that finishes (value or error) has its outcome cached along
//!    with the dependencies it declared
//! 4. A function that is missing dependencies schedules them for the next
//!    wave and is run again once all of them have finished
//! 5. In fail-fast mode, the first failure stops unrelated work; the error
//!    is handed to each waiting parent in turn, which may turn it into its
//!    own error or otherwise inherits it unchanged

mod env;
mod graph;
mod key;
mod types;

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{Span, debug, info, trace, warn};

use crate::config::EvaluatorConfig;
use crate::loader::{FileFunction, PackageFunction, PackageLookupFunction};
use crate::marker::TargetMarkerFunction;
use crate::vfs::{FileSystem, ModifiedFileSet};

pub use env::Environment;
pub use key::{NodeKey, NodeKind, NodeValue};
pub use types::{EngineError, ErrorInfo, EvaluationResult, EvaluationStats, NodeError};

use graph::{NodeEntry, NodeGraph};

/// Computes the value of one kind of node.
///
/// Implementations must be deterministic in their declared dependencies:
/// run again with the same dependency values, they must ask for the same
/// keys and produce the same outcome.
pub trait NodeFunction: Send + Sync {
  fn compute(&self, key: &NodeKey, env: &mut Environment<'_>) -> Result<Option<NodeValue>, NodeError>;
}

enum Outcome {
  Done {
    result: Result<NodeValue, ErrorInfo>,
    deps: Vec<NodeKey>,
    complete: bool,
  },
  Restart {
    missing: Vec<NodeKey>,
  },
}

type FunctionMap = HashMap<NodeKind, Arc<dyn NodeFunction>>;

/// Configures an [`Evaluator`].
pub struct EvaluatorBuilder {
  functions: FunctionMap,
  package_path: Vec<PathBuf>,
  parallelism: usize,
}

impl EvaluatorBuilder {
  /// Register the function computing nodes of `kind`, replacing any earlier one.
  pub fn register(mut self, kind: NodeKind, function: impl NodeFunction + 'static) -> Self {
    self.functions.insert(kind, Arc::new(function));
    self
  }

  /// Roots that workspace-relative modified paths are resolved against.
  pub fn package_path(mut self, roots: Vec<PathBuf>) -> Self {
    self.package_path = roots;
    self
  }

  pub fn parallelism(mut self, threads: usize) -> Self {
    self.parallelism = threads;
    self
  }

  pub fn build(self) -> Result<Evaluator, EngineError> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(self.parallelism.max(1))
      .thread_name(|idx| format!("bmk-eval-{}", idx))
      .build()?;

    Ok(Evaluator {
      functions: self.functions,
      package_path: self.package_path,
      graph: NodeGraph::default(),
      pool,
    })
  }
}

/// The incremental evaluator: owns the node cache and the worker pool.
pub struct Evaluator {
  functions: FunctionMap,
  package_path: Vec<PathBuf>,
  graph: NodeGraph,
  pool: rayon::ThreadPool,
}

impl Evaluator {
  pub fn builder() -> EvaluatorBuilder {
    EvaluatorBuilder {
      functions: HashMap::new(),
      package_path: Vec::new(),
      parallelism: 1,
    }
  }

  /// An evaluator with the file, package lookup, package and target marker
  /// functions registered, reading through `fs`.
  pub fn new(fs: Arc<dyn FileSystem>, config: &EvaluatorConfig) -> Result<Self, EngineError> {
    Self::builder()
      .package_path(config.package_path.clone())
      .parallelism(config.parallelism)
      .register(NodeKind::File, FileFunction::new(fs.clone()))
      .register(NodeKind::PackageLookup, PackageLookupFunction::new(config))
      .register(NodeKind::Package, PackageFunction::new(fs))
      .register(NodeKind::TargetMarker, TargetMarkerFunction)
      .build()
  }

  /// Number of finished nodes currently cached.
  pub fn cached_nodes(&self) -> usize {
    self.graph.len()
  }

  pub fn is_cached(&self, key: &NodeKey) -> bool {
    self.graph.contains(key)
  }

  /// Evaluate `keys`, reusing every cached node that is still valid.
  pub fn evaluate(&mut self, keys: &[NodeKey], keep_going: bool) -> EvaluationResult {
    let mut stats = EvaluationStats::default();
    let mut pending: BTreeSet<NodeKey> = BTreeSet::new();
    for key in keys {
      if self.graph.contains(key) {
        stats.cache_hits += 1;
      } else {
        pending.insert(key.clone());
      }
    }

    // blocked: key -> dependencies it still waits for; waiters: the reverse.
    let mut blocked: HashMap<NodeKey, HashSet<NodeKey>> = HashMap::new();
    let mut waiters: HashMap<NodeKey, HashSet<NodeKey>> = HashMap::new();
    // Outcomes of this run that cannot be cached.
    let mut uncommitted: HashMap<NodeKey, ErrorInfo> = HashMap::new();
    let mut transient_values: HashMap<NodeKey, NodeValue> = HashMap::new();
    // Set once a fail-fast run hits its first error: parent -> child error it inherits.
    let mut bubbling: Option<HashMap<NodeKey, ErrorInfo>> = None;

    while !pending.is_empty() {
      stats.waves += 1;
      let wave: Vec<NodeKey> = std::mem::take(&mut pending).into_iter().collect();
      trace!(wave = stats.waves, keys = wave.len(), "running wave");

      let outcomes: Vec<(NodeKey, Outcome)> = {
        let functions = &self.functions;
        let graph = &self.graph;
        let uncommitted = &uncommitted;
        // Worker threads log under the caller's span.
        let span = Span::current();
        self.pool.install(|| {
          wave
            .into_par_iter()
            .map(|key| {
              let outcome = span.in_scope(|| run_node(functions, graph, uncommitted, &key));
              (key, outcome)
            })
            .collect()
        })
      };

      let mut finished: Vec<NodeKey> = Vec::new();
      let mut failed: Vec<(NodeKey, ErrorInfo)> = Vec::new();
      let mut restarted: Vec<(NodeKey, Vec<NodeKey>)> = Vec::new();

      for (key, outcome) in outcomes {
        if matches!(outcome, Outcome::Done { .. }) || bubbling.is_some() {
          *stats.computed.entry(key.kind()).or_default() += 1;
        }

        if let Some(causes) = &bubbling {
          let own_error = matches!(&outcome, Outcome::Done { result: Err(_), .. });
          if let (false, Some(cause)) = (own_error, causes.get(&key)) {
            debug!(key = %key, "inheriting dependency error");
            uncommitted.insert(key.clone(), cause.clone());
            failed.push((key.clone(), cause.clone()));
            finished.push(key);
            continue;
          }
        }

        match outcome {
          Outcome::Done { result, deps, complete } => {
            match &result {
              Ok(value) => {
                debug!(key = %key, "computed node");
                if !complete {
                  transient_values.insert(key.clone(), value.clone());
                }
              }
              Err(info) => {
                debug!(key = %key, error = %info, "node failed");
                failed.push((key.clone(), info.clone()));
                if !complete {
                  uncommitted.insert(key.clone(), info.clone());
                }
              }
            }
            if complete {
              self.graph.insert(key.clone(), NodeEntry { result, deps });
            }
            finished.push(key);
          }
          Outcome::Restart { missing } => {
            stats.restarts += 1;
            trace!(key = %key, missing = missing.len(), "waiting on dependencies");
            restarted.push((key, missing));
          }
        }
      }

      // Dependencies that finished in this same wave are no longer missing.
      let restarted: Vec<(NodeKey, HashSet<NodeKey>)> = restarted
        .into_iter()
        .map(|(key, missing)| {
          let still_missing = missing
            .into_iter()
            .filter(|dep| !self.graph.contains(dep) && !uncommitted.contains_key(dep))
            .collect();
          (key, still_missing)
        })
        .collect();

      // Register every wait before scheduling, so a blocked key is not rescheduled.
      for (key, deps) in &restarted {
        if !deps.is_empty() {
          blocked.insert(key.clone(), deps.clone());
        }
      }
      for (key, deps) in restarted {
        if deps.is_empty() {
          pending.insert(key);
          continue;
        }
        for dep in deps {
          if !blocked.contains_key(&dep) {
            pending.insert(dep.clone());
          }
          waiters.entry(dep).or_default().insert(key.clone());
        }
      }

      if !keep_going && (bubbling.is_some() || !failed.is_empty()) {
        if bubbling.is_none() {
          warn!(
            failed = failed.len(),
            abandoned = pending.len() + blocked.len(),
            "stopping evaluation at first error"
          );
        }
        let causes = bubbling.get_or_insert_with(HashMap::new);
        pending.clear();
        for (key, info) in &failed {
          for waiter in waiters.remove(key).unwrap_or_default() {
            blocked.remove(&waiter);
            causes.entry(waiter.clone()).or_insert_with(|| info.clone());
            pending.insert(waiter);
          }
        }
      } else {
        for key in &finished {
          for waiter in waiters.remove(key).unwrap_or_default() {
            if let Some(deps) = blocked.get_mut(&waiter) {
              deps.remove(key);
              if deps.is_empty() {
                blocked.remove(&waiter);
                pending.insert(waiter);
              }
            }
          }
        }
      }
    }

    if bubbling.is_none() && !blocked.is_empty() {
      let mut stuck: Vec<NodeKey> = blocked.keys().cloned().collect();
      stuck.sort();
      warn!(keys = stuck.len(), "evaluation stalled on a dependency cycle");
      for key in &stuck {
        uncommitted.insert(key.clone(), ErrorInfo::from_node(key, NodeError::Cycle(stuck.clone())));
      }
    }

    let mut result = EvaluationResult::default();
    for key in keys {
      if let Some(entry) = self.graph.get(key) {
        match &entry.result {
          Ok(value) => {
            result.values.insert(key.clone(), value.clone());
          }
          Err(info) => {
            result.errors.insert(key.clone(), info.clone());
          }
        }
      } else if let Some(info) = uncommitted.get(key) {
        result.errors.insert(key.clone(), info.clone());
      } else if let Some(value) = transient_values.get(key) {
        result.values.insert(key.clone(), value.clone());
      }
    }

    info!(
      requested = keys.len(),
      errors = result.errors.len(),
      computed = stats.total_computed(),
      cache_hits = stats.cache_hits,
      waves = stats.waves,
      "evaluation finished"
    );
    result.stats = stats;
    result
  }

  /// Evict every node affected by `modified` and return the evicted keys.
  ///
  /// Each path is resolved against every package path root; a directory
  /// invalidates every file below it.
  pub fn invalidate(&mut self, modified: &ModifiedFileSet) -> BTreeSet<NodeKey> {
    if modified.is_empty() {
      return BTreeSet::new();
    }
    let evicted = if modified.treat_everything_as_modified() {
      self.graph.clear()
    } else {
      let dirty: Vec<PathBuf> = modified
        .paths()
        .flat_map(|rel| self.package_path.iter().map(move |root| root.join(rel)))
        .collect();
      self.graph.invalidate_paths(&dirty)
    };

    info!(evicted = evicted.len(), cached = self.graph.len(), "invalidated modified files");
    evicted
  }
}

fn run_node(
  functions: &FunctionMap,
  graph: &NodeGraph,
  uncommitted: &HashMap<NodeKey, ErrorInfo>,
  key: &NodeKey,
) -> Outcome {
  let Some(function) = functions.get(&key.kind()) else {
    let error = NodeError::Internal(format!("no function registered for {}", key.kind()));
    return Outcome::Done {
      result: Err(ErrorInfo::from_node(key, error)),
      deps: Vec::new(),
      complete: true,
    };
  };

  let mut env = Environment::new(graph, uncommitted);
  let computed = function.compute(key, &mut env);
  let (deps, missing, saw_uncommitted) = env.finish();
  let complete = missing.is_empty() && !saw_uncommitted;

  match computed {
    Ok(Some(value)) if missing.is_empty() => Outcome::Done {
      result: Ok(value),
      deps,
      complete,
    },
    Ok(_) if !missing.is_empty() => Outcome::Restart { missing },
    Ok(_) => {
      let error = NodeError::Internal(format!("{} returned no value without missing dependencies", key));
      Outcome::Done {
        result: Err(ErrorInfo::from_node(key, error)),
        deps,
        complete,
      }
    }
    Err(error) => Outcome::Done {
      result: Err(ErrorInfo::from_node(key, error)),
      deps,
      complete,
    },
  }
}
