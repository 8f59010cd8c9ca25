// SPDX-License-Identifier: MIT

//! The two package-scoped blob kinds (`spec.md` §3 "Blob kinds"): the
//! package object itself and the task objects it names by hash.

use e3_core::{Hash, TreePath};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// `{commandIr, inputs, output}` — stored as its own content-addressed
/// blob so the scheduler and task runner can address it by `taskHash`
/// without fetching the whole package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskObject {
    /// Opaque command expression, interpreted by the (out-of-scope)
    /// per-language task runner.
    pub command_ir: Vec<u8>,
    pub inputs: Vec<TreePath>,
    pub output: TreePath,
}

/// `{name, version, datasets, tasks}` — the immutable, content-addressed
/// root of a deployable package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageObject {
    pub name: String,
    pub version: String,
    /// Root hash of a tree object declaring `inputs.<name>` /
    /// `outputs.<name>` entries.
    pub datasets: Hash,
    /// Task name to the hash of its [`TaskObject`] blob.
    pub tasks: IndexMap<String, Hash>,
}

/// Root-pointer entry stored alongside the `objects/` closure in a
/// package zip (`spec.md` §6.3), the way an OCI image layout carries an
/// `index.json` next to its content-addressed `blobs/`. Not itself part
/// of the object store: it only tells the loader which imported blob is
/// the package root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub hash: Hash,
}

/// One row of [`crate::PackageStore::list`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub hash: Hash,
    pub imported_at: chrono::DateTime<chrono::Utc>,
}
