// SPDX-License-Identifier: MIT

//! Data-tree engine: `DataRef`-valued tree objects with copy-on-write
//! updates. A tree object is a JSON-encoded ordered map of field name to
//! `DataRef`, content-addressed the same way as any other blob.

use crate::objects::{ObjectStore, StoreError};
use e3_core::{DataRef, DatasetStatus, Hash, TreePath};
use indexmap::IndexMap;
use thiserror::Error;

pub type Tree = IndexMap<String, DataRef>;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("path not found: {path}")]
    PathNotFound { path: TreePath },
    #[error("not a tree at {path}")]
    NotATree { path: TreePath },
    #[error("type mismatch updating {path}: existing ref is a {existing_kind}, new ref is a {new_kind}")]
    TypeMismatch {
        path: TreePath,
        existing_kind: &'static str,
        new_kind: &'static str,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("malformed tree object: {0}")]
    Codec(#[from] serde_json::Error),
}

impl e3_core::HasErrorKind for TreeError {
    fn kind(&self) -> e3_core::ErrorKind {
        match self {
            TreeError::PathNotFound { .. } => e3_core::ErrorKind::NotFound,
            TreeError::NotATree { .. } | TreeError::TypeMismatch { .. } => e3_core::ErrorKind::Invalid,
            TreeError::Store(e) => e3_core::HasErrorKind::kind(e),
            TreeError::Codec(_) => e3_core::ErrorKind::Codec,
        }
    }
}

/// Read a tree object's fields, in their original (insertion) order.
pub fn read_tree(store: &ObjectStore, hash: &Hash) -> Result<Tree, TreeError> {
    let bytes = store.read(hash)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_tree(store: &ObjectStore, tree: &Tree) -> Result<Hash, TreeError> {
    let bytes = serde_json::to_vec(tree)?;
    Ok(store.write(&bytes)?)
}

/// The `DataRef` found at `path` under `root`. The root itself (empty
/// path) resolves to `tree(root)`.
pub fn walk(store: &ObjectStore, root: &Hash, path: &TreePath) -> Result<DataRef, TreeError> {
    if path.is_root() {
        return Ok(DataRef::tree(root.clone()));
    }
    let mut current = root.clone();
    let mut consumed = TreePath::root();
    let mut remaining = path.clone();
    loop {
        let tree = read_tree(store, &current)?;
        // Loop only continues while `remaining` is non-root (checked below).
        #[allow(clippy::expect_used)]
        let (head, rest) = remaining
            .split_first()
            .expect("loop invariant: remaining is non-root while looping");
        let next_ref = tree
            .get(head)
            .cloned()
            .ok_or_else(|| TreeError::PathNotFound { path: path.clone() })?;
        consumed = consumed.push(head);
        if rest.is_root() {
            return Ok(next_ref);
        }
        match next_ref {
            DataRef::Tree { hash } => {
                current = hash;
                remaining = rest;
            }
            _ => {
                return Err(TreeError::NotATree {
                    path: consumed,
                })
            }
        }
    }
}

/// Field names directly under the tree at `path`.
pub fn list_tree(store: &ObjectStore, root: &Hash, path: &TreePath) -> Result<Vec<String>, TreeError> {
    let at_path = walk(store, root, path)?;
    let hash = match at_path {
        DataRef::Tree { hash } => hash,
        _ => return Err(TreeError::NotATree { path: path.clone() }),
    };
    Ok(read_tree(store, &hash)?.into_keys().collect())
}

/// One entry in a flattened [`list_tree_recursive`] view.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub path: TreePath,
    pub r#ref: DataRef,
}

/// Flatten the tree at `path` depth-first. `max_depth` bounds how many
/// tree levels are descended into (`None` = unbounded); `DataRef`s at the
/// depth limit are still reported, just not expanded further.
pub fn list_tree_recursive(
    store: &ObjectStore,
    root: &Hash,
    path: &TreePath,
    max_depth: Option<usize>,
) -> Result<Vec<TreeEntry>, TreeError> {
    let mut out = Vec::new();
    let start = walk(store, root, path)?;
    let start_hash = match start {
        DataRef::Tree { hash } => hash,
        _ => return Err(TreeError::NotATree { path: path.clone() }),
    };
    collect_recursive(store, &start_hash, path, 0, max_depth, &mut out)?;
    Ok(out)
}

fn collect_recursive(
    store: &ObjectStore,
    tree_hash: &Hash,
    prefix: &TreePath,
    depth: usize,
    max_depth: Option<usize>,
    out: &mut Vec<TreeEntry>,
) -> Result<(), TreeError> {
    let tree = read_tree(store, tree_hash)?;
    for (name, r#ref) in tree {
        let child_path = prefix.push(&name);
        let descend = matches!(r#ref, DataRef::Tree { .. })
            && max_depth.map(|limit| depth + 1 < limit).unwrap_or(true);
        if descend {
            if let DataRef::Tree { hash } = &r#ref {
                collect_recursive(store, hash, &child_path, depth + 1, max_depth, out)?;
            }
        } else {
            out.push(TreeEntry {
                path: child_path,
                r#ref,
            });
        }
    }
    Ok(())
}

/// Copy-on-write update: replace the ref at `path`, rewriting every
/// ancestor up to the root. Returns the new root hash; unmodified
/// subtrees keep their original hash (structural sharing).
pub fn update(
    store: &ObjectStore,
    root: &Hash,
    path: &TreePath,
    new_ref: DataRef,
) -> Result<Hash, TreeError> {
    let (parent_path, field) = path
        .split_last()
        .ok_or_else(|| TreeError::PathNotFound { path: path.clone() })?;

    let mut frames: Vec<(Tree, String)> = Vec::with_capacity(parent_path.segments().len());
    let mut current = root.clone();
    let mut consumed = TreePath::root();
    let mut remaining = parent_path.clone();
    while let Some((head, rest)) = remaining.split_first() {
        let tree = read_tree(store, &current)?;
        consumed = consumed.push(head);
        let next_ref = tree
            .get(head)
            .cloned()
            .ok_or_else(|| TreeError::PathNotFound { path: path.clone() })?;
        let next_hash = match next_ref {
            DataRef::Tree { hash } => hash,
            _ => return Err(TreeError::NotATree { path: consumed.clone() }),
        };
        frames.push((tree, head.to_string()));
        current = next_hash;
        remaining = rest;
    }

    let mut leaf_tree = read_tree(store, &current)?;
    let existing = leaf_tree
        .get(field)
        .ok_or_else(|| TreeError::PathNotFound { path: path.clone() })?;
    check_type_compat(path, existing, &new_ref)?;
    leaf_tree.insert(field.to_string(), new_ref);
    let mut new_hash = write_tree(store, &leaf_tree)?;

    for (mut tree, field) in frames.into_iter().rev() {
        tree.insert(field, DataRef::tree(new_hash));
        new_hash = write_tree(store, &tree)?;
    }

    Ok(new_hash)
}

fn check_type_compat(path: &TreePath, existing: &DataRef, new_ref: &DataRef) -> Result<(), TreeError> {
    let kind = |r: &DataRef| match r {
        DataRef::Unassigned => None,
        DataRef::Null => None,
        DataRef::Value { .. } => Some("value"),
        DataRef::Tree { .. } => Some("tree"),
    };
    match (kind(existing), kind(new_ref)) {
        (Some(a), Some(b)) if a != b => Err(TreeError::TypeMismatch {
            path: path.clone(),
            existing_kind: a,
            new_kind: b,
        }),
        _ => Ok(()),
    }
}

/// Status of a dataset at a ref, without resolving the underlying blob.
pub fn dataset_status(r#ref: &DataRef) -> DatasetStatus {
    r#ref.status()
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
