// SPDX-License-Identifier: MIT

use super::*;
use tempfile::tempdir;

fn store() -> (tempfile::TempDir, ObjectStore) {
    let dir = tempdir().unwrap();
    let store = ObjectStore::open(dir.path().join("objects")).unwrap();
    (dir, store)
}

fn leaf_value(store: &ObjectStore, bytes: &[u8]) -> DataRef {
    DataRef::value(store.write(bytes).unwrap())
}

fn write_simple_tree(store: &ObjectStore) -> Hash {
    // /outputs/say_hello -> unassigned, /inputs/name -> value("bob")
    let mut outputs = Tree::new();
    outputs.insert("say_hello".to_string(), DataRef::unassigned());
    let outputs_hash = write_tree(store, &outputs).unwrap();

    let mut inputs = Tree::new();
    inputs.insert("name".to_string(), leaf_value(store, b"bob"));
    let inputs_hash = write_tree(store, &inputs).unwrap();

    let mut root = Tree::new();
    root.insert("outputs".to_string(), DataRef::tree(outputs_hash));
    root.insert("inputs".to_string(), DataRef::tree(inputs_hash));
    write_tree(store, &root).unwrap()
}

#[test]
fn walk_resolves_nested_leaf() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);

    let r#ref = walk(&store, &root, &TreePath::parse("inputs/name")).unwrap();
    assert_eq!(r#ref.status(), DatasetStatus::Computed);
}

#[test]
fn walk_root_path_returns_tree_ref() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    let r#ref = walk(&store, &root, &TreePath::root()).unwrap();
    assert_eq!(r#ref, DataRef::tree(root));
}

#[test]
fn walk_missing_path_is_not_found() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    let err = walk(&store, &root, &TreePath::parse("inputs/missing")).unwrap_err();
    assert!(matches!(err, TreeError::PathNotFound { .. }));
}

#[test]
fn walk_through_non_tree_is_not_a_tree() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    // `inputs/name` is a value, not a tree, so descending past it fails.
    let err = walk(&store, &root, &TreePath::parse("inputs/name/deeper")).unwrap_err();
    assert!(matches!(err, TreeError::NotATree { .. }));
}

#[test]
fn list_tree_returns_field_names() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    let mut fields = list_tree(&store, &root, &TreePath::root()).unwrap();
    fields.sort();
    assert_eq!(fields, vec!["inputs".to_string(), "outputs".to_string()]);
}

#[test]
fn update_replaces_leaf_and_preserves_sibling_hash() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    let before = walk(&store, &root, &TreePath::parse("inputs")).unwrap();

    let new_root = update(
        &store,
        &root,
        &TreePath::parse("outputs/say_hello"),
        leaf_value(&store, b"hello bob"),
    )
    .unwrap();

    assert_ne!(new_root, root, "root hash changes after an update");

    let updated = walk(&store, &new_root, &TreePath::parse("outputs/say_hello")).unwrap();
    assert_eq!(updated.status(), DatasetStatus::Computed);

    // The untouched `inputs` subtree keeps its original hash (structural sharing).
    let after = walk(&store, &new_root, &TreePath::parse("inputs")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn update_missing_field_is_not_found() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    let err = update(
        &store,
        &root,
        &TreePath::parse("outputs/does_not_exist"),
        leaf_value(&store, b"x"),
    )
    .unwrap_err();
    assert!(matches!(err, TreeError::PathNotFound { .. }));
}

#[test]
fn update_rejects_tree_to_value_type_mismatch() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    let err = update(
        &store,
        &root,
        &TreePath::parse("inputs"),
        leaf_value(&store, b"not a tree"),
    )
    .unwrap_err();
    assert!(matches!(err, TreeError::TypeMismatch { .. }));
}

#[test]
fn update_unassigned_to_value_is_allowed() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);
    // outputs/say_hello starts unassigned; this is the normal task-completion path.
    let new_root = update(
        &store,
        &root,
        &TreePath::parse("outputs/say_hello"),
        leaf_value(&store, b"hi"),
    );
    assert!(new_root.is_ok());
}

#[test]
fn list_tree_recursive_flattens_with_depth_limit() {
    let (_dir, store) = store();
    let root = write_simple_tree(&store);

    let unbounded = list_tree_recursive(&store, &root, &TreePath::root(), None).unwrap();
    assert_eq!(unbounded.len(), 2);

    let bounded = list_tree_recursive(&store, &root, &TreePath::root(), Some(1)).unwrap();
    // At depth limit 1, both subtrees (outputs, inputs) are reported unexpanded.
    assert_eq!(bounded.len(), 2);
    assert!(bounded.iter().all(|e| matches!(e.r#ref, DataRef::Tree { .. })));
}
