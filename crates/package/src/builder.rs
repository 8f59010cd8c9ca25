// SPDX-License-Identifier: MIT

//! Test-only package construction: build a `PackageObject` + its task
//! objects + datasets tree directly against an [`ObjectStore`], then zip
//! it the same way the (out-of-scope) authoring SDK would.

use crate::model::{PackageManifest, PackageObject, TaskObject};
use e3_core::{DataRef, Hash, TreePath, TypedValue};
use e3_store::{archive, ObjectStore, Tree};
use indexmap::IndexMap;

/// Declares one task to add to a built package.
pub struct TaskDecl {
    pub name: String,
    pub command_ir: Vec<u8>,
    pub inputs: Vec<TreePath>,
    pub output: TreePath,
}

/// Builds a package object graph directly in an [`ObjectStore`], for
/// tests and the end-to-end scenario fixtures.
pub struct PackageBuilder<'a> {
    store: &'a ObjectStore,
    name: String,
    version: String,
    inputs: IndexMap<String, DataRef>,
    outputs: IndexMap<String, DataRef>,
    tasks: IndexMap<String, Hash>,
}

impl<'a> PackageBuilder<'a> {
    pub fn new(store: &'a ObjectStore, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            version: version.into(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            tasks: IndexMap::new(),
        }
    }

    /// Declare an input dataset with a default value.
    pub fn input_with_default(mut self, name: &str, r#type: &str, value: serde_json::Value) -> Self {
        let tv = TypedValue::new(r#type, value);
        let bytes = e3_core::codec::encode_value(&tv).expect("json encoding of a test fixture value cannot fail");
        let hash = self.store.write(&bytes).expect("writing a test fixture value cannot fail");
        self.inputs.insert(name.to_string(), DataRef::value(hash));
        self
    }

    /// Declare an input dataset with no default (unassigned until the
    /// deploying caller supplies one, or — for S1-style fixtures — left
    /// for a direct `workspace.set_root` poke).
    pub fn input_unassigned(mut self, name: &str) -> Self {
        self.inputs.insert(name.to_string(), DataRef::unassigned());
        self
    }

    /// Declare an output dataset (always starts `unassigned`).
    pub fn output(mut self, name: &str) -> Self {
        self.outputs.insert(name.to_string(), DataRef::unassigned());
        self
    }

    /// Add a task, writing its `TaskObject` blob immediately.
    pub fn task(mut self, decl: TaskDecl) -> Self {
        let task_object = TaskObject {
            command_ir: decl.command_ir,
            inputs: decl.inputs,
            output: decl.output,
        };
        let bytes = serde_json::to_vec(&task_object).expect("json encoding of a test fixture task cannot fail");
        let hash = self.store.write(&bytes).expect("writing a test fixture task cannot fail");
        self.tasks.insert(decl.name, hash);
        self
    }

    /// Finish building: writes the `inputs`/`outputs`/datasets trees and
    /// the package object, and returns both the package hash and a
    /// ready-to-import zip archive.
    pub fn build(self) -> (Hash, Vec<u8>) {
        let mut inputs_tree: Tree = IndexMap::new();
        inputs_tree.extend(self.inputs);
        let inputs_hash = write_tree(self.store, &inputs_tree);

        let mut outputs_tree: Tree = IndexMap::new();
        outputs_tree.extend(self.outputs);
        let outputs_hash = write_tree(self.store, &outputs_tree);

        let mut datasets_tree: Tree = IndexMap::new();
        datasets_tree.insert("inputs".to_string(), DataRef::tree(inputs_hash));
        datasets_tree.insert("outputs".to_string(), DataRef::tree(outputs_hash));
        let datasets_hash = write_tree(self.store, &datasets_tree);

        let package = PackageObject {
            name: self.name.clone(),
            version: self.version.clone(),
            datasets: datasets_hash,
            tasks: self.tasks,
        };
        let package_bytes = serde_json::to_vec(&package).expect("json encoding of a test fixture package cannot fail");
        let package_hash = self.store.write(&package_bytes).expect("writing a test fixture package cannot fail");

        let manifest = PackageManifest {
            name: self.name,
            version: self.version,
            hash: package_hash.clone(),
        };
        let manifest_bytes = serde_json::to_vec(&manifest).expect("json encoding of a test fixture manifest cannot fail");

        let closure = e3_store::gc::mark(self.store, [datasets_hash_from(&package)]);
        let mut all = closure;
        all.insert(package_hash.clone());
        for task_hash in package.tasks.values() {
            all.insert(task_hash.clone());
        }

        let zip_bytes = archive::build(self.store, all, ("manifest.json", &manifest_bytes))
            .expect("zipping a test fixture closure cannot fail");
        (package_hash, zip_bytes)
    }
}

fn datasets_hash_from(package: &PackageObject) -> Hash {
    package.datasets.clone()
}

fn write_tree(store: &ObjectStore, tree: &Tree) -> Hash {
    let bytes = serde_json::to_vec(tree).expect("json encoding of a test fixture tree cannot fail");
    store.write(&bytes).expect("writing a test fixture tree cannot fail")
}
