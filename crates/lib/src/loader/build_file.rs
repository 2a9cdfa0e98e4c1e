//! BUILD file schema and package construction.
//!
//! A BUILD file is TOML with one `[[rule]]` table per rule:
//!
//! ```toml
//! [[rule]]
//! kind = "sh_library"
//! name = "foo"
//! srcs = ["b/c/foo.sh"]
//! outs = ["foo.out"]
//! deps = ["//lib:util"]
//! ```
//!
//! Construction never fails as a whole. Problems with individual rules are
//! recorded as events on the package, the offending rule is marked in error
//! where it exists, and the package is marked in error.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::label::{Label, PackageId};

use super::types::{Package, Rule, Target, TargetKind};

/// Parsed contents of a BUILD file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFile {
  #[serde(rename = "rule", default)]
  pub rules: Vec<RuleDecl>,
}

/// A `[[rule]]` table as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
  pub kind: String,
  pub name: String,
  #[serde(default)]
  pub srcs: Vec<String>,
  #[serde(default)]
  pub outs: Vec<String>,
  #[serde(default)]
  pub deps: Vec<String>,
}

impl BuildFile {
  pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(contents)
  }
}

struct PackageBuilder {
  id: PackageId,
  targets: BTreeMap<String, Target>,
  events: Vec<String>,
  in_error: bool,
}

impl PackageBuilder {
  fn error(&mut self, event: String) {
    self.events.push(event);
    self.in_error = true;
  }

  fn rule_error(&mut self, rule: &str, event: String) {
    if let Some(target) = self.targets.get_mut(rule) {
      target.in_error = true;
    }
    self.error(event);
  }

  fn labels(&mut self, rule: &str, attr: &str, entries: &[String]) -> Vec<Label> {
    let mut labels = Vec::with_capacity(entries.len());
    for entry in entries {
      match Label::parse_relative(entry, &self.id) {
        Ok(label) => labels.push(label),
        Err(e) => self.rule_error(rule, format!("invalid label '{}' in {} of rule '{}': {}", entry, attr, rule, e)),
      }
    }
    labels
  }
}

/// Build the package `id` from a parsed BUILD file.
///
/// Rules are declared first, then their outputs, then source files for every
/// same-package `srcs` entry that no rule or output already claims.
pub(crate) fn construct_package(id: PackageId, build_file: PathBuf, decl: BuildFile) -> Package {
  let mut builder = PackageBuilder {
    id,
    targets: BTreeMap::new(),
    events: Vec::new(),
    in_error: false,
  };

  let mut declared: Vec<&RuleDecl> = Vec::new();
  for rule in &decl.rules {
    if let Err(e) = Label::new(builder.id.clone(), &rule.name) {
      builder.error(format!("invalid rule name '{}': {}", rule.name, e));
      continue;
    }
    if builder.targets.contains_key(&rule.name) {
      builder.error(format!("rule '{}' in package '{}' conflicts with existing rule", rule.name, builder.id));
      continue;
    }

    // srcs and deps are resolved below; the rule must exist first so errors can mark it.
    builder.targets.insert(
      rule.name.clone(),
      Target {
        name: rule.name.clone(),
        kind: TargetKind::Rule(Rule {
          rule_class: rule.kind.clone(),
          srcs: Vec::new(),
          outs: Vec::new(),
          deps: Vec::new(),
        }),
        in_error: false,
      },
    );
    declared.push(rule);
  }

  for rule in &declared {
    let srcs = builder.labels(&rule.name, "srcs", &rule.srcs);
    let deps = builder.labels(&rule.name, "deps", &rule.deps);

    let mut outs = Vec::new();
    for out in &rule.outs {
      if let Err(e) = Label::new(builder.id.clone(), out) {
        builder.rule_error(&rule.name, format!("invalid output '{}' in rule '{}': {}", out, rule.name, e));
        continue;
      }
      if let Some(existing) = builder.targets.get(out) {
        let event = format!(
          "generated file '{}' in rule '{}' conflicts with existing {} '{}'",
          out,
          rule.name,
          existing.description(),
          out
        );
        builder.rule_error(&rule.name, event);
        continue;
      }
      builder.targets.insert(
        out.clone(),
        Target {
          name: out.clone(),
          kind: TargetKind::OutputFile {
            generating_rule: rule.name.clone(),
          },
          in_error: false,
        },
      );
      outs.push(out.clone());
    }

    if let Some(Target {
      kind: TargetKind::Rule(declared_rule),
      ..
    }) = builder.targets.get_mut(&rule.name)
    {
      declared_rule.srcs = srcs;
      declared_rule.outs = outs;
      declared_rule.deps = deps;
    }
  }

  let inputs: Vec<String> = builder
    .targets
    .values()
    .filter_map(|target| match &target.kind {
      TargetKind::Rule(rule) => Some(rule.srcs.iter()),
      _ => None,
    })
    .flatten()
    .filter(|label| label.package() == &builder.id)
    .map(|label| label.name().to_string())
    .collect();
  for name in inputs {
    builder.targets.entry(name.clone()).or_insert(Target {
      name,
      kind: TargetKind::InputFile,
      in_error: false,
    });
  }

  Package {
    id: builder.id,
    build_file,
    targets: builder.targets,
    in_error: builder.in_error,
    events: builder.events,
  }
}
