// SPDX-License-Identifier: MIT

//! Dataflow planner (`spec.md` §4.I): builds the task dependency graph
//! from a package's tasks and its declared dataset shape.

use crate::error::PlannerError;
use e3_core::Hash;
use e3_package::PackageStore;
use e3_store::{tree, ObjectStore, TreeError};
use e3_workspace::WorkspaceState;
use indexmap::IndexMap;
use serde::Serialize;

/// One task as planned: its identity, declared I/O, and the names of the
/// tasks it depends on (insertion order, matching the package's `tasks`
/// map order).
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTask {
    pub name: String,
    pub task_hash: Hash,
    pub inputs: Vec<e3_core::TreePath>,
    pub output: e3_core::TreePath,
    pub depends_on: Vec<String>,
}

/// The planned dependency graph plus its content hash
/// (`spec.md` §4.I: "used by the scheduler to key state persistence").
#[derive(Debug, Clone)]
pub struct DataflowGraph {
    pub tasks: IndexMap<String, PlannedTask>,
    pub graph_hash: Hash,
}

impl DataflowGraph {
    /// Task names with no unmet dependency — the initial `ready` set
    /// before considering input availability (`spec.md` §4.J step 1).
    pub fn roots(&self) -> Vec<&str> {
        self.tasks
            .values()
            .filter(|t| t.depends_on.is_empty())
            .map(|t| t.name.as_str())
            .collect()
    }
}

/// Narrow a dataset-shape lookup's `PathNotFound` to the named-variant
/// `UnknownInputPath` (`spec.md` §4.I); any other tree error still
/// propagates as-is.
fn unknown_path_as_such(result: Result<e3_core::DataRef, TreeError>, task: &str, path: &e3_core::TreePath) -> Result<(), PlannerError> {
    match result {
        Ok(_) => Ok(()),
        Err(TreeError::PathNotFound { .. }) => Err(PlannerError::UnknownInputPath {
            task: task.to_string(),
            path: path.clone(),
        }),
        Err(other) => Err(other.into()),
    }
}

/// Build the dependency graph for `state`'s deployed package.
///
/// `u` depends on `t` iff one of `u`'s input paths overlaps `t`'s output
/// path (equal, ancestor, or descendant — `spec.md` §4.I).
pub fn plan(
    objects: &ObjectStore,
    packages: &PackageStore,
    state: &WorkspaceState,
) -> Result<DataflowGraph, PlannerError> {
    let package = packages.load(&state.package_hash)?;

    struct Raw {
        name: String,
        task_hash: Hash,
        inputs: Vec<e3_core::TreePath>,
        output: e3_core::TreePath,
    }

    let mut raw = Vec::with_capacity(package.tasks.len());
    for (name, task_hash) in &package.tasks {
        let task = packages.load_task(task_hash)?;
        for input in &task.inputs {
            // Validate against the package's declared dataset shape,
            // which is stable regardless of the workspace's current root.
            unknown_path_as_such(tree::walk(objects, &package.datasets, input), name, input)?;
        }
        unknown_path_as_such(tree::walk(objects, &package.datasets, &task.output), name, &task.output)?;
        raw.push(Raw {
            name: name.clone(),
            task_hash: task_hash.clone(),
            inputs: task.inputs,
            output: task.output,
        });
    }

    // Output-path conflicts: two distinct tasks writing the identical path.
    for (i, a) in raw.iter().enumerate() {
        for b in &raw[i + 1..] {
            if a.output == b.output {
                return Err(PlannerError::OutputPathConflict {
                    first: a.name.clone(),
                    second: b.name.clone(),
                    path: a.output.clone(),
                });
            }
        }
    }

    let mut tasks: IndexMap<String, PlannedTask> = IndexMap::with_capacity(raw.len());
    for r in &raw {
        let mut depends_on = Vec::new();
        for other in &raw {
            if other.name == r.name {
                continue;
            }
            if r.inputs.iter().any(|input| input.overlaps(&other.output)) && !depends_on.contains(&other.name) {
                depends_on.push(other.name.clone());
            }
        }
        tasks.insert(
            r.name.clone(),
            PlannedTask {
                name: r.name.clone(),
                task_hash: r.task_hash.clone(),
                inputs: r.inputs.clone(),
                output: r.output.clone(),
                depends_on,
            },
        );
    }

    detect_cycle(&tasks)?;

    let graph_hash = hash_graph(&tasks);
    Ok(DataflowGraph { tasks, graph_hash })
}

/// Kahn's algorithm over the `depends_on` edges: repeatedly remove tasks
/// with no unresolved dependency. Whatever remains once no more can be
/// removed is exactly the set of tasks on (or downstream of) a cycle.
fn detect_cycle(tasks: &IndexMap<String, PlannedTask>) -> Result<(), PlannerError> {
    use std::collections::{HashMap, VecDeque};

    let mut remaining_deps: HashMap<&str, usize> = tasks
        .values()
        .map(|t| (t.name.as_str(), t.depends_on.len()))
        .collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for t in tasks.values() {
        for dep in &t.depends_on {
            dependents.entry(dep.as_str()).or_default().push(t.name.as_str());
        }
    }

    let mut queue: VecDeque<&str> = remaining_deps
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut resolved = 0usize;

    while let Some(name) = queue.pop_front() {
        resolved += 1;
        if let Some(downstream) = dependents.get(name) {
            for &d in downstream {
                if let Some(count) = remaining_deps.get_mut(d) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(d);
                    }
                }
            }
        }
    }

    if resolved < tasks.len() {
        let mut cyclic: Vec<String> = remaining_deps
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        cyclic.sort();
        return Err(PlannerError::CycleDetected(cyclic));
    }
    Ok(())
}

fn hash_graph(tasks: &IndexMap<String, PlannedTask>) -> Hash {
    #[derive(Serialize)]
    struct Entry<'a> {
        name: &'a str,
        task_hash: &'a Hash,
        inputs: &'a [e3_core::TreePath],
        output: &'a e3_core::TreePath,
        depends_on: &'a [String],
    }
    let entries: Vec<Entry> = tasks
        .values()
        .map(|t| Entry {
            name: &t.name,
            task_hash: &t.task_hash,
            inputs: &t.inputs,
            output: &t.output,
            depends_on: &t.depends_on,
        })
        .collect();
    let bytes = serde_json::to_vec(&entries).unwrap_or_default();
    Hash::of_bytes(&bytes)
}

#[cfg(test)]
#[path = "planner_tests.rs"]
pub(crate) mod tests;
