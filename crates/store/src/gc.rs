// SPDX-License-Identifier: MIT

//! Mark-from-roots garbage collection over the object store.
//!
//! The live set is the transitive closure reachable from every workspace
//! root, package ref, and non-cached running execution record. Anything
//! else, once older than `min_age`, is swept.

use crate::objects::ObjectStore;
use crate::tree::{self, TreeError};
use e3_core::{DataRef, Hash};
use std::collections::HashSet;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct GcOptions {
    pub dry_run: bool,
    pub min_age: Duration,
    /// `spec.md` Open Question 2: execution records aren't treated as
    /// extra live roots for their `outputHash` beyond what a workspace
    /// root already reaches; flipping this on keeps them alive anyway.
    pub retain_execution_outputs: bool,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            min_age: Duration::from_secs(60),
            retain_execution_outputs: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct GcReport {
    pub retained_objects: u64,
    pub deleted_objects: u64,
    pub deleted_partials: u64,
    pub skipped_young: u64,
    pub bytes_freed: u64,
}

/// Walk every hash reachable from `roots`, following tree objects.
/// Unreadable/corrupt subtrees are treated as unreachable rather than
/// aborting the whole sweep — a root pointing at a missing blob is itself
/// a bug elsewhere, not something GC should panic over.
pub fn mark(store: &ObjectStore, roots: impl IntoIterator<Item = Hash>) -> HashSet<Hash> {
    let mut live = HashSet::new();
    let mut stack: Vec<Hash> = roots.into_iter().collect();
    while let Some(hash) = stack.pop() {
        if !live.insert(hash.clone()) {
            continue;
        }
        match tree::read_tree(store, &hash) {
            Ok(fields) => {
                for (_, r#ref) in fields {
                    if let DataRef::Tree { hash } | DataRef::Value { hash } = r#ref {
                        if !live.contains(&hash) {
                            stack.push(hash);
                        }
                    }
                }
            }
            Err(TreeError::Codec(_)) => {
                // Not a tree object (a plain value blob) — it's a leaf, already marked.
            }
            Err(e) => {
                warn!(hash = %hash, error = %e, "gc: could not read reachable object, treating as a leaf");
            }
        }
    }
    live
}

/// Sweep every object not in `live` and older than `opts.min_age`, plus
/// orphaned `*.partial` temp files. Reads the live set once; concurrent
/// writers are unaffected since new blobs land via temp-and-rename and
/// are too young to be swept in the same pass.
pub fn sweep(store: &ObjectStore, live: &HashSet<Hash>, opts: &GcOptions) -> Result<GcReport, crate::objects::StoreError> {
    let mut report = GcReport::default();
    let now = SystemTime::now();

    for hash in store.iter_hashes()? {
        if live.contains(&hash) {
            report.retained_objects += 1;
            continue;
        }
        let age = age_of(store.modified_at(&hash)?, now);
        if age < opts.min_age {
            report.skipped_young += 1;
            continue;
        }
        if opts.dry_run {
            report.deleted_objects += 1;
            continue;
        }
        let size = std::fs::metadata(store.path_for(&hash)).map(|m| m.len()).unwrap_or(0);
        store.delete(&hash)?;
        report.deleted_objects += 1;
        report.bytes_freed += size;
    }

    for (path, modified) in store.iter_partials()? {
        let age = age_of(modified, now);
        if age < opts.min_age {
            report.skipped_young += 1;
            continue;
        }
        if opts.dry_run {
            report.deleted_partials += 1;
            continue;
        }
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                report.deleted_partials += 1;
                report.bytes_freed += size;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        retained = report.retained_objects,
        deleted = report.deleted_objects,
        deleted_partials = report.deleted_partials,
        dry_run = opts.dry_run,
        "gc sweep complete"
    );
    Ok(report)
}

fn age_of(modified: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(modified).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[path = "gc_tests.rs"]
mod tests;
