//! Targets command implementation.
//!
//! Loads one package and lists its targets and construction errors.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};

use buildmark_lib::engine::{NodeKey, NodeValue};
use buildmark_lib::label::PackageId;

use crate::output::{self, OutputFormat, print_error, print_json, print_success, print_warning};

pub fn cmd_targets(workspace: &Path, package: &str, format: OutputFormat) -> Result<ExitCode> {
  let id = PackageId::parse(package.trim_start_matches("//"))?;
  let (_, mut evaluator) = super::open_workspace(workspace)?;

  let key = NodeKey::Package(id.clone());
  let result = evaluator.evaluate(std::slice::from_ref(&key), false);
  if let Some(info) = result.error(&key) {
    print_error(&info.to_string());
    return Ok(ExitCode::FAILURE);
  }
  let package = result
    .get(&key)
    .and_then(NodeValue::as_package)
    .with_context(|| format!("No result for package '{}'", id))?;

  if format.is_json() {
    let targets: Vec<_> = package.targets().collect();
    let json_output = serde_json::json!({
      "package": id.to_string(),
      "build_file": package.build_file(),
      "in_error": package.contains_errors(),
      "targets": targets,
      "events": package.events(),
    });
    print_json(&json_output)?;
    return Ok(ExitCode::SUCCESS);
  }

  print_success(&format!(
    "Package //{} ({} targets, {})",
    id,
    package.targets().count(),
    package.build_file().display()
  ));
  for target in package.targets() {
    let symbol = if target.in_error {
      output::symbols::ERROR
    } else {
      output::symbols::INFO
    };
    let description = format!("({})", target.description());
    println!(
      "  {} //{}:{} {}",
      symbol,
      id,
      target.name,
      description.if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
  for event in package.events() {
    print_warning(event);
  }

  Ok(ExitCode::SUCCESS)
}
