use buildmark_lib::engine::{NodeKey, NodeKind};
use buildmark_lib::label::PackageId;
use buildmark_lib::marker::ResolveError;
use buildmark_lib::vfs::ModifiedFileSet;

use super::common::{FOO_BUILD, TestWorkspace, key};

#[test]
fn deleting_the_subpackage_makes_the_label_resolvable_again() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.write("a/b/BUILD", "");
  assert!(matches!(
    ws.resolve("//a:b/c/foo.sh"),
    Err(ResolveError::BoundaryCrossing { .. })
  ));

  ws.remove("a/b/BUILD");
  ws.invalidate(&["a/b/BUILD"]);

  assert!(ws.resolve("//a:b/c/foo.sh").is_ok());
}

#[test]
fn unrelated_changes_keep_the_cache() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.resolve("//a:foo").unwrap();

  let evicted = ws.invalidate(&["z/BUILD", "a/README"]);
  assert!(evicted.is_empty());
  let cached = ws.evaluator.cached_nodes();
  assert!(ws.evaluator.invalidate(&ModifiedFileSet::default()).is_empty());
  assert_eq!(ws.evaluator.cached_nodes(), cached);

  let result = ws.evaluate(&["//a:foo"], false);
  assert_eq!(result.stats().total_computed(), 0);
}

#[test]
fn editing_a_build_file_reloads_only_that_package() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.write("x/BUILD", FOO_BUILD);
  ws.evaluate(&["//a:foo", "//x:foo"], true);

  ws.write("a/BUILD", "[[rule]]\nkind = \"sh_binary\"\nname = \"bar\"\n");
  let evicted = ws.invalidate(&["a/BUILD"]);
  assert!(evicted.contains(&NodeKey::Package(PackageId::parse("a").unwrap())));
  assert!(evicted.contains(&key("//a:foo")));
  assert!(!evicted.contains(&key("//x:foo")));

  let result = ws.evaluate(&["//a:bar", "//a:foo", "//x:foo"], true);
  assert_eq!(result.stats().computed(NodeKind::Package), 1);
  assert_eq!(result.stats().cache_hits, 1);
  assert!(result.get(&key("//a:bar")).is_some());
  assert!(result.error(&key("//a:foo")).is_some());
}

#[test]
fn directory_change_invalidates_files_below_it() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.resolve("//a:b/c/foo.sh").unwrap();

  ws.write("a/b/c/BUILD", "");
  let evicted = ws.invalidate(&["a/b"]);
  assert!(evicted.contains(&key("//a:b/c/foo.sh")));

  let err = ws.resolve("//a:b/c/foo.sh").unwrap_err();
  assert!(err.to_string().contains("crosses boundary of subpackage 'a/b/c'"));
}

#[test]
fn fixed_io_failure_recovers_after_invalidation() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.fail_stat("a/b/BUILD", "nope");
  assert!(ws.resolve("//a:b/c/foo.sh").is_err());

  ws.fs.inner.clear_stat_error(TestWorkspace::path("a/b/BUILD"));
  // Without invalidation the cached failure stands.
  assert!(ws.resolve("//a:b/c/foo.sh").is_err());

  ws.invalidate(&["a/b/BUILD"]);
  assert!(ws.resolve("//a:b/c/foo.sh").is_ok());
}

#[test]
fn everything_modified_drops_the_whole_cache() {
  let mut ws = TestWorkspace::new();
  ws.write("a/BUILD", FOO_BUILD);
  ws.resolve("//a:foo").unwrap();
  let reads = ws.fs.reads();

  let evicted = ws.evaluator.invalidate(&ModifiedFileSet::everything_modified());
  assert!(evicted.contains(&key("//a:foo")));
  assert_eq!(ws.evaluator.cached_nodes(), 0);

  ws.resolve("//a:foo").unwrap();
  assert_eq!(ws.fs.reads(), reads + 1);
}
