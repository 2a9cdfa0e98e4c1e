//! Resolve command implementation.
//!
//! Resolves each label to a target and prints one line per label.

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;

use buildmark_lib::engine::{EvaluationResult, NodeError, NodeKey};
use buildmark_lib::label::Label;
use buildmark_lib::loader::Target;
use buildmark_lib::marker::{self, ResolveError};

use crate::output::{
  OutputFormat, format_elapsed, print_failure, print_info, print_json, print_stat, print_success, print_warning,
};

#[derive(Serialize)]
struct LabelReport {
  label: String,
  #[serde(flatten)]
  outcome: LabelOutcome,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum LabelOutcome {
  Resolved {
    package: String,
    target: Target,
  },
  Failed {
    kind: &'static str,
    message: String,
    root_causes: Vec<String>,
  },
  /// Abandoned by a fail-fast run before it finished.
  Skipped,
}

#[derive(Serialize)]
struct ResolveReport {
  labels: Vec<LabelReport>,
  resolved: usize,
  failed: usize,
  elapsed_ms: u128,
}

fn error_kind(error: &NodeError) -> &'static str {
  match error {
    NodeError::Resolve(ResolveError::BuildUnitNotFound { .. }) => "build_unit_not_found",
    NodeError::Resolve(ResolveError::TransitiveLoadFailure { .. }) => "transitive_load_failure",
    NodeError::Resolve(ResolveError::BoundaryCrossing { .. }) => "boundary_crossing",
    NodeError::Resolve(ResolveError::TargetNotFound { .. }) => "target_not_found",
    NodeError::Resolve(ResolveError::TargetInError { .. }) => "target_in_error",
    NodeError::Load(_) => "load_failure",
    NodeError::Cycle(_) => "cycle",
    NodeError::Internal(_) => "internal",
  }
}

fn outcome(key: &NodeKey, result: &EvaluationResult) -> LabelOutcome {
  if let Some(value) = result.get(key).and_then(|value| value.as_target_marker()) {
    return LabelOutcome::Resolved {
      package: value.package().id().to_string(),
      target: value.target().clone(),
    };
  }
  match result.error(key) {
    Some(info) => LabelOutcome::Failed {
      kind: error_kind(info.error()),
      message: info.to_string(),
      root_causes: info.root_causes().iter().map(ToString::to_string).collect(),
    },
    None => LabelOutcome::Skipped,
  }
}

pub fn cmd_resolve(
  workspace: &Path,
  labels: &[String],
  keep_going: bool,
  format: OutputFormat,
  verbose: bool,
) -> Result<ExitCode> {
  let start = Instant::now();
  let (config, mut evaluator) = super::open_workspace(workspace)?;
  let keep_going = keep_going || config.keep_going;

  let labels = labels
    .iter()
    .map(|raw| Label::parse(raw))
    .collect::<Result<Vec<_>, _>>()?;
  let keys: Vec<NodeKey> = labels.iter().cloned().map(marker::key).collect();

  let result = evaluator.evaluate(&keys, keep_going);
  let reports: Vec<LabelReport> = labels
    .iter()
    .zip(&keys)
    .map(|(label, key)| LabelReport {
      label: label.to_string(),
      outcome: outcome(key, &result),
    })
    .collect();

  let resolved = reports
    .iter()
    .filter(|r| matches!(r.outcome, LabelOutcome::Resolved { .. }))
    .count();
  let failed = reports.len() - resolved;
  let elapsed = start.elapsed();

  if format.is_json() {
    print_json(&ResolveReport {
      labels: reports,
      resolved,
      failed,
      elapsed_ms: elapsed.as_millis(),
    })?;
  } else {
    for report in &reports {
      match &report.outcome {
        LabelOutcome::Resolved { target, .. } => {
          print_success(&format!("{} ({})", report.label, target.description()))
        }
        LabelOutcome::Failed { message, .. } => print_failure(&format!("{}: {}", report.label, message)),
        LabelOutcome::Skipped => print_warning(&format!("{}: not resolved, stopped at first error", report.label)),
      }
    }

    if verbose {
      let stats = result.stats();
      println!();
      print_info(&format!("{} of {} labels resolved", resolved, reports.len()));
      print_stat("Nodes computed", &stats.total_computed().to_string());
      print_stat("Restarts", &stats.restarts.to_string());
      print_stat("Waves", &stats.waves.to_string());
      print_stat("Elapsed", &format_elapsed(elapsed));
    }
  }

  Ok(if failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
