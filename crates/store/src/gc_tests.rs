// SPDX-License-Identifier: MIT

use super::*;
use crate::tree::Tree;
use std::thread::sleep;

fn store() -> (tempfile::TempDir, ObjectStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ObjectStore::open(dir.path().join("objects")).unwrap();
    (dir, store)
}

#[test]
fn mark_follows_tree_refs_transitively() {
    let (_dir, store) = store();
    let leaf = store.write(b"leaf value").unwrap();

    let mut inner = Tree::new();
    inner.insert("a".to_string(), DataRef::value(leaf.clone()));
    let inner_hash = store.write(&serde_json::to_vec(&inner).unwrap()).unwrap();

    let mut root = Tree::new();
    root.insert("child".to_string(), DataRef::tree(inner_hash.clone()));
    let root_hash = store.write(&serde_json::to_vec(&root).unwrap()).unwrap();

    let live = mark(&store, [root_hash.clone()]);
    assert!(live.contains(&root_hash));
    assert!(live.contains(&inner_hash));
    assert!(live.contains(&leaf));
}

#[test]
fn sweep_deletes_unreachable_objects_past_min_age() {
    let (_dir, store) = store();
    let kept = store.write(b"kept").unwrap();
    let garbage = store.write(b"garbage").unwrap();

    let live: std::collections::HashSet<_> = [kept.clone()].into_iter().collect();
    sleep(std::time::Duration::from_millis(5));

    let opts = GcOptions {
        dry_run: false,
        min_age: Duration::from_millis(1),
        retain_execution_outputs: false,
    };
    let report = sweep(&store, &live, &opts).unwrap();

    assert!(store.exists(&kept));
    assert!(!store.exists(&garbage));
    assert_eq!(report.deleted_objects, 1);
    assert_eq!(report.retained_objects, 1);
}

#[test]
fn sweep_skips_objects_younger_than_min_age() {
    let (_dir, store) = store();
    let garbage = store.write(b"fresh garbage").unwrap();
    let live = std::collections::HashSet::new();

    let opts = GcOptions {
        dry_run: false,
        min_age: Duration::from_secs(3600),
        retain_execution_outputs: false,
    };
    let report = sweep(&store, &live, &opts).unwrap();

    assert!(store.exists(&garbage));
    assert_eq!(report.deleted_objects, 0);
    assert_eq!(report.skipped_young, 1);
}

#[test]
fn dry_run_deletes_nothing() {
    let (_dir, store) = store();
    let garbage = store.write(b"garbage").unwrap();
    let live = std::collections::HashSet::new();
    sleep(std::time::Duration::from_millis(5));

    let opts = GcOptions {
        dry_run: true,
        min_age: Duration::from_millis(1),
        retain_execution_outputs: false,
    };
    let report = sweep(&store, &live, &opts).unwrap();

    assert!(store.exists(&garbage), "dry run must not delete");
    assert_eq!(report.deleted_objects, 1, "report still counts what would be deleted");
}

#[test]
fn sweep_removes_orphan_partial_files() {
    let (_dir, store) = store();
    let partial = store.root().join("aa").join("deadbeef.partial");
    std::fs::create_dir_all(partial.parent().unwrap()).unwrap();
    std::fs::write(&partial, b"half written").unwrap();
    sleep(std::time::Duration::from_millis(5));

    let opts = GcOptions {
        dry_run: false,
        min_age: Duration::from_millis(1),
        retain_execution_outputs: false,
    };
    let report = sweep(&store, &std::collections::HashSet::new(), &opts).unwrap();

    assert!(!partial.exists());
    assert_eq!(report.deleted_partials, 1);
}
