use std::sync::Arc;

use buildmark_lib::config::EvaluatorConfig;
use buildmark_lib::engine::NodeKind;

use super::common::{FOO_BUILD, TestWorkspace, WS, key, marker_outcome};

#[test]
fn repeated_evaluation_is_served_from_cache() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);

  let first = ws.evaluate(&["//a:b/c/foo.sh"], false);
  let reads = ws.fs.reads();
  let stats = ws.fs.stats();
  assert_eq!(first.stats().computed(NodeKind::Package), 1);

  let second = ws.evaluate(&["//a:b/c/foo.sh"], false);
  assert_eq!(second.stats().total_computed(), 0);
  assert_eq!(second.stats().cache_hits, 1);
  assert_eq!(ws.fs.reads(), reads);
  assert_eq!(ws.fs.stats(), stats);
  assert_eq!(
    marker_outcome(&first, "//a:b/c/foo.sh").unwrap(),
    marker_outcome(&second, "//a:b/c/foo.sh").unwrap()
  );
}

#[test]
fn repeated_failure_is_served_from_cache() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.write("a/b/BUILD", "");

  let first = ws.evaluate(&["//a:b/c/foo.sh"], false);
  let reads = ws.fs.reads();

  let second = ws.evaluate(&["//a:b/c/foo.sh"], false);
  assert_eq!(second.stats().total_computed(), 0);
  assert_eq!(ws.fs.reads(), reads);
  assert_eq!(
    first.error(&key("//a:b/c/foo.sh")),
    second.error(&key("//a:b/c/foo.sh"))
  );
}

#[test]
fn boundary_checks_never_parse_nested_packages() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.write("a/b/BUILD", "this is not toml [");

  let err = ws.resolve("//a:b/c/foo.sh").unwrap_err();
  assert!(err.to_string().contains("crosses boundary of subpackage 'a/b'"));
  assert_eq!(ws.fs.reads(), 1);
}

#[test]
fn labels_in_one_package_share_the_loaded_package() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);

  let result = ws.evaluate(&["//a:foo", "//a:b/c/foo.sh"], true);
  let foo = marker_outcome(&result, "//a:foo").unwrap();
  let src = marker_outcome(&result, "//a:b/c/foo.sh").unwrap();

  assert!(Arc::ptr_eq(foo.package(), src.package()));
  assert_eq!(result.stats().computed(NodeKind::Package), 1);
  assert_eq!(ws.fs.reads(), 1);

  // Later evaluations in the same epoch reuse it too.
  let again = ws.resolve("//a:foo").unwrap();
  assert!(Arc::ptr_eq(foo.package(), again.package()));
}

#[test]
fn boundary_lookups_are_batched_into_one_wave() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", "[[rule]]\nkind = \"x\"\nname = \"deep\"\nsrcs = [\"b/c/d/e/f.txt\"]\n");

  let result = ws.evaluate(&["//a:b/c/d/e/f.txt"], false);
  assert!(marker_outcome(&result, "//a:b/c/d/e/f.txt").is_ok());
  // One lookup for `a` and one per prefix.
  assert_eq!(result.stats().computed(NodeKind::PackageLookup), 5);
  // The marker waits twice: on its package, then on all four prefixes at once.
  // Each lookup waits once on its FILE node and the package once on its lookup.
  assert_eq!(result.stats().restarts, 2 + 5 + 1);
}

#[test]
fn many_packages_resolve_in_parallel() {
  let mut config = EvaluatorConfig::for_workspace(WS);
  config.parallelism = 4;
  let mut ws = TestWorkspace::with_config(config);

  let labels: Vec<String> = (0..32)
    .map(|i| {
      ws.write(&format!("p{}/BUILD", i), FOO_BUILD);
      format!("//p{}:b/c/foo.sh", i)
    })
    .collect();
  let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

  let result = ws.evaluate(&labels, true);
  assert!(!result.has_error());
  assert_eq!(result.values().count(), 32);
  assert_eq!(result.stats().computed(NodeKind::Package), 32);
}
