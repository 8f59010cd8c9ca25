// SPDX-License-Identifier: MIT

//! One open repository: the five on-disk directories `spec.md` §6.1
//! names, plus every store opened against them.

use crate::error::EngineError;
use e3_package::PackageStore;
use e3_scheduler::{ExecutionRecordStore, FileDataflowStateStore};
use e3_store::ObjectStore;
use e3_workspace::WorkspaceStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The five directories that make a path a valid e3 repository
/// (`spec.md` §6.1: "A repository is valid iff all five directories
/// ... exist").
const REPO_DIRS: [&str; 5] = ["objects", "packages", "workspaces", "executions", "tmp"];

/// One open repository: every store, rooted at the same directory tree.
#[derive(Clone)]
pub struct Repo {
    root: PathBuf,
    objects: ObjectStore,
    packages: PackageStore,
    workspaces: WorkspaceStore,
    executions: ExecutionRecordStore,
    state_store: Arc<FileDataflowStateStore>,
}

impl Repo {
    /// True iff every one of the five required directories exists under
    /// `path`.
    pub fn is_valid(path: &Path) -> bool {
        REPO_DIRS.iter().all(|d| path.join(d).is_dir())
    }

    /// Create a fresh repository at `path` (`spec.md` §6.1), failing if
    /// one already exists there.
    pub fn init(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = path.into();
        if Self::is_valid(&root) {
            return Err(EngineError::AlreadyInitialized(root));
        }
        for dir in REPO_DIRS {
            std::fs::create_dir_all(root.join(dir))?;
        }
        Self::open(root)
    }

    /// Open an already-initialized repository at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = path.into();
        if !Self::is_valid(&root) {
            return Err(EngineError::InvalidRepo(root));
        }
        let objects = ObjectStore::open(root.join("objects"))?;
        let packages = PackageStore::open(objects.clone(), root.join("packages"))?;
        let workspaces = WorkspaceStore::open(objects.clone(), root.join("workspaces"))?;
        let executions = ExecutionRecordStore::open(root.join("executions"));
        let state_store = Arc::new(FileDataflowStateStore::new(root.join("workspaces")));
        Ok(Self {
            root,
            objects,
            packages,
            workspaces,
            executions,
            state_store,
        })
    }

    /// Open `path` if it's already a valid repository, or initialize a
    /// fresh one there otherwise — the shape `e3 init` and ad hoc test
    /// fixtures both want.
    pub fn open_or_init(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let root = path.into();
        if Self::is_valid(&root) {
            Self::open(root)
        } else {
            Self::init(root)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn label(&self) -> String {
        self.root.display().to_string()
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn packages(&self) -> &PackageStore {
        &self.packages
    }

    pub fn workspaces(&self) -> &WorkspaceStore {
        &self.workspaces
    }

    pub fn executions(&self) -> &ExecutionRecordStore {
        &self.executions
    }

    pub fn state_store(&self) -> Arc<FileDataflowStateStore> {
        self.state_store.clone()
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
