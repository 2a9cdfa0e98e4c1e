use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use buildmark_lib::config::EvaluatorConfig;
use buildmark_lib::consts::DELETED_PACKAGE_REASON;
use buildmark_lib::engine::{Evaluator, NodeError, NodeKey, NodeKind};
use buildmark_lib::label::{Label, PackageId};
use buildmark_lib::marker::ResolveError;
use buildmark_lib::vfs::OsFileSystem;
use tempfile::TempDir;

use super::common::{FOO_BUILD, TestWorkspace, key, marker_outcome};

const CONFLICT_BUILD: &str = r#"
[[rule]]
kind = "genrule"
name = "conflict1"
outs = ["conflict"]

[[rule]]
kind = "genrule"
name = "conflict2"
outs = ["conflict"]
"#;

#[test]
fn declared_source_file_resolves() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);

  let value = ws.resolve("//a:b/c/foo.sh").unwrap();
  assert_eq!(value.label(), &Label::parse("//a:b/c/foo.sh").unwrap());
  assert_eq!(value.target().name, "b/c/foo.sh");
  assert_eq!(value.target().description(), "source file");
}

#[test]
fn boundary_crossing_after_subpackage_appears() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  assert!(ws.resolve("//a:b/c/foo.sh").is_ok());

  ws.write("a/b/BUILD", "");
  ws.invalidate(&["a/b/BUILD"]);

  let err = ws.resolve("//a:b/c/foo.sh").unwrap_err();
  assert!(matches!(err, ResolveError::BoundaryCrossing { .. }));
  assert!(err.to_string().contains("crosses boundary of subpackage 'a/b'"));
  assert!(err.to_string().contains("perhaps you meant to put the colon here: '//a/b:c/foo.sh'?"));
  assert_eq!(err.package().as_str(), "a/b");
}

#[test]
fn boundary_crossing_wins_over_missing_target() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.write("a/b/c/BUILD", "");

  let err = ws.resolve("//a:b/c/undeclared.sh").unwrap_err();
  assert!(err.to_string().contains("crosses boundary of subpackage 'a/b/c'"));
}

#[test]
fn shortest_nested_package_is_reported() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.write("a/b/BUILD", "");
  ws.write("a/b/c/BUILD", "");

  let err = ws.resolve("//a:b/c/foo.sh").unwrap_err();
  assert!(matches!(
    err,
    ResolveError::BoundaryCrossing { ref subpackage, .. } if subpackage.as_str() == "a/b"
  ));
}

#[test]
fn directory_without_build_file_is_not_a_boundary() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.fs.inner.create_dir_all(TestWorkspace::path("a/b/c"));
  ws.fs.inner.create_dir_all(TestWorkspace::path("a/b/BUILD"));

  assert!(ws.resolve("//a:b/c/foo.sh").is_ok());
}

#[test]
fn missing_package_is_build_unit_not_found() {
  let mut ws = TestWorkspace::new();

  let err = ws.resolve("//no/such/package:target/withslash").unwrap_err();
  assert!(matches!(err, ResolveError::BuildUnitNotFound { .. }));
  assert_eq!(err.package(), &PackageId::parse("no/such/package").unwrap());
  assert_eq!(
    err.to_string(),
    "no such package 'no/such/package': BUILD file not found on package path for 'no/such/package'"
  );
}

#[test]
fn sibling_error_puts_healthy_target_in_error() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", CONFLICT_BUILD);

  let err = ws.resolve("//a:conflict1").unwrap_err();
  assert!(matches!(err, ResolveError::TargetInError { .. }));
  assert!(err.to_string().contains("contains an error and its package is in error"));
  assert_eq!(err.label(), &Label::parse("//a:conflict1").unwrap());
  assert!(err.has_target());
}

#[test]
fn undeclared_target_is_not_found() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);

  let err = ws.resolve("//a:bar").unwrap_err();
  assert!(matches!(err, ResolveError::TargetNotFound { .. }));
  assert!(!err.has_target());
  assert!(err.to_string().contains("defined by /ws/a/BUILD"));
}

#[test]
fn io_failure_on_boundary_lookup_is_kept_verbatim() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.fail_stat("a/b/BUILD", "nope");

  let err = ws.resolve("//a:b/c").unwrap_err();
  assert!(matches!(err, ResolveError::TransitiveLoadFailure { .. }));
  assert_eq!(err.package().as_str(), "a/b");
  assert!(err.to_string().contains("nope"));
  assert_eq!(err.to_string(), "no such package 'a/b': nope");
}

#[test]
fn io_failure_on_owning_package_is_kept_verbatim() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.fail_stat("a/BUILD", "permission denied (stubbed)");

  let err = ws.resolve("//a:foo").unwrap_err();
  assert!(matches!(err, ResolveError::TransitiveLoadFailure { .. }));
  assert_eq!(err.to_string(), "no such package 'a': permission denied (stubbed)");
}

#[test]
fn malformed_build_file_is_a_transitive_failure() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", "[[rule]]\nkind = \"x\"\nname = \"y\"\nunexpected = 1\n");

  let err = ws.resolve("//a:y").unwrap_err();
  assert!(matches!(err, ResolveError::TransitiveLoadFailure { .. }));
  assert!(err.to_string().contains("error parsing /ws/a/BUILD"));
}

#[test]
fn failures_are_rooted_at_the_requested_key() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", CONFLICT_BUILD);
  ws.write("b/BUILD", FOO_BUILD);
  ws.write("b/b/BUILD", "");
  ws.fail_stat("c/BUILD", "nope");
  ws.write("d/BUILD", "");
  ws.fail_stat("d/b/BUILD", "nope");

  let labels = [
    "//a:conflict1",
    "//b:b/c/foo.sh",
    "//c:x",
    "//nowhere:x",
    "//b:missing",
    "//d:b/c/d",
  ];
  for keep_going in [true, false] {
    for label in labels {
      let mut fresh = TestWorkspace::new();
      fresh.write("a/BUILD", CONFLICT_BUILD);
      fresh.write("b/BUILD", FOO_BUILD);
      fresh.write("b/b/BUILD", "");
      fresh.fail_stat("c/BUILD", "nope");
      fresh.write("d/BUILD", "");
      fresh.fail_stat("d/b/BUILD", "nope");

      let result = fresh.evaluate(&[label], keep_going);
      let info = result.error(&key(label)).unwrap();
      assert_eq!(info.root_causes(), &[key(label)], "{}", label);
      assert!(matches!(info.error(), NodeError::Resolve(_)), "{}", label);
    }
  }

  let result = ws.evaluate(&labels, true);
  for label in labels {
    assert_eq!(result.error(&key(label)).unwrap().root_causes(), &[key(label)]);
  }
}

#[test]
fn failed_boundary_lookup_decides_before_its_siblings_finish() {
  for keep_going in [true, false] {
    let mut ws = TestWorkspace::new();
    ws.write("a/BUILD", "");
    ws.fail_stat("a/b/BUILD", "nope");

    let result = ws.evaluate(&["//a:b/c/d"], keep_going);
    let err = marker_outcome(&result, "//a:b/c/d").unwrap_err();
    match err {
      ResolveError::TransitiveLoadFailure { package, cause, .. } => {
        assert_eq!(package.as_str(), "a/b");
        assert_eq!(cause, "nope");
      }
      other => panic!("unexpected error: {}", other),
    }
  }
}

#[test]
fn paths_below_regular_files_do_not_exist_on_disk() {
  let temp = TempDir::new().unwrap();
  fs::create_dir_all(temp.path().join("a")).unwrap();
  fs::write(temp.path().join("a").join("BUILD"), FOO_BUILD).unwrap();
  fs::write(temp.path().join("a").join("data.txt"), "data").unwrap();

  let config = EvaluatorConfig::for_workspace(temp.path());
  let mut evaluator = Evaluator::new(Arc::new(OsFileSystem), &config).unwrap();
  let labels = ["//a:data.txt/inner", "//a/data.txt:x"];
  let keys: Vec<NodeKey> = labels.iter().map(|label| key(label)).collect();
  let result = evaluator.evaluate(&keys, true);

  let err = marker_outcome(&result, "//a:data.txt/inner").unwrap_err();
  assert!(matches!(err, ResolveError::TargetNotFound { .. }), "{}", err);
  let err = marker_outcome(&result, "//a/data.txt:x").unwrap_err();
  assert!(matches!(err, ResolveError::BuildUnitNotFound { .. }), "{}", err);
}

#[test]
fn deleted_packages_are_not_boundaries() {
  let mut config = EvaluatorConfig::for_workspace(super::common::WS);
  config.deleted_packages = BTreeSet::from([PackageId::parse("a/b").unwrap()]);
  let mut ws = TestWorkspace::with_config(config);
  ws.write("a/BUILD", FOO_BUILD);
  ws.write("a/b/BUILD", "");

  assert!(ws.resolve("//a:b/c/foo.sh").is_ok());

  let err = ws.resolve("//a/b:anything").unwrap_err();
  assert!(matches!(err, ResolveError::BuildUnitNotFound { .. }));
  assert!(err.to_string().ends_with(DELETED_PACKAGE_REASON));
}

#[test]
fn package_path_roots_are_searched_in_order() {
  let mut config = EvaluatorConfig::for_workspace("/first");
  config.package_path.push(PathBuf::from("/second"));
  let mut ws = TestWorkspace::with_config(config);
  ws.fs.inner.write_file("/first/a/BUILD", "[[rule]]\nkind = \"first\"\nname = \"x\"\n");
  ws.fs.inner.write_file("/second/a/BUILD", "[[rule]]\nkind = \"second\"\nname = \"x\"\n");
  ws.fs.inner.write_file("/second/b/BUILD", "[[rule]]\nkind = \"second\"\nname = \"y\"\n");

  let a = ws.resolve("//a:x").unwrap();
  assert_eq!(a.target().description(), "first rule");
  assert_eq!(a.package().build_file(), &PathBuf::from("/first/a/BUILD"));

  let b = ws.resolve("//b:y").unwrap();
  assert_eq!(b.package().build_file(), &PathBuf::from("/second/b/BUILD"));
}

#[test]
fn keep_going_collects_independent_failures() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);

  let labels = ["//a:foo", "//a:missing", "//none:x"];
  let result = ws.evaluate(&labels, true);

  assert!(marker_outcome(&result, "//a:foo").is_ok());
  assert!(matches!(
    marker_outcome(&result, "//a:missing"),
    Err(ResolveError::TargetNotFound { .. })
  ));
  assert!(matches!(
    marker_outcome(&result, "//none:x"),
    Err(ResolveError::BuildUnitNotFound { .. })
  ));
  assert_eq!(result.errors().count(), 2);
}

#[test]
fn fail_fast_still_reports_the_classified_error() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);

  let result = ws.evaluate(&["//none:x", "//a:foo"], false);
  assert!(matches!(
    marker_outcome(&result, "//none:x"),
    Err(ResolveError::BuildUnitNotFound { .. })
  ));
  assert!(result.stats().computed(NodeKind::TargetMarker) >= 1);
}
