// SPDX-License-Identifier: MIT

//! Workspace directory/state management (`spec.md` §4.E).

use crate::error::WorkspaceError;
use crate::lock::{current_holder, LockOperation, LockService};
use crate::model::WorkspaceState;
use chrono::Utc;
use e3_core::Hash;
use e3_package::PackageStore;
use e3_store::{archive, gc, ObjectStore};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// `<repo>/workspaces`: one directory per workspace plus its sibling
/// `<name>.lock` file.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    objects: ObjectStore,
    root: PathBuf,
    locks: LockService,
}

impl WorkspaceStore {
    pub fn open(objects: ObjectStore, root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let locks = LockService::new(&root);
        Ok(Self { objects, root, locks })
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn locks(&self) -> &LockService {
        &self.locks
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn state_path(&self, name: &str) -> PathBuf {
        self.dir(name).join("state")
    }

    /// Writes an empty workspace directory; no state file (`spec.md`
    /// §4.E `create`).
    pub fn create(&self, name: &str) -> Result<(), WorkspaceError> {
        let dir = self.dir(name);
        if dir.is_dir() {
            return Err(WorkspaceError::AlreadyExists(name.to_string()));
        }
        fs::create_dir_all(&dir)?;
        Ok(())
    }

    fn write_state_atomic(&self, name: &str, state: &WorkspaceState) -> Result<(), WorkspaceError> {
        let path = self.state_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension(format!("{}.partial", uuid::Uuid::new_v4()));
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Deploy `pkg_ref` (a package name or `name@version`) into
    /// `workspace`, serialized under the `deployment` lock operation. The
    /// root tree starts out as the package's own `datasets` tree — since
    /// both are immutable and content-addressed, reusing the hash *is*
    /// the deep copy spec.md describes; nothing needs rewriting until the
    /// workspace's own root diverges from the package's.
    pub fn deploy(
        &self,
        name: &str,
        pkg_ref: &str,
        packages: &PackageStore,
    ) -> Result<WorkspaceState, WorkspaceError> {
        let holder = current_holder(format!("e3 deploy {name}"));
        let handle = self.locks.acquire(name, LockOperation::Deployment, holder)?;

        let result = (|| -> Result<WorkspaceState, WorkspaceError> {
            fs::create_dir_all(self.dir(name))?;
            let package_hash = packages.resolve(pkg_ref)?;
            let package = packages.load(&package_hash)?;
            let now = Utc::now();
            let state = WorkspaceState {
                package_name: package.name,
                package_version: package.version,
                package_hash,
                deployed_at: now,
                root_hash: package.datasets,
                root_updated_at: now,
            };
            self.write_state_atomic(name, &state)?;
            info!(workspace = name, package = %state.package_name, version = %state.package_version, "deployed workspace");
            Ok(state)
        })();

        handle.release();
        result
    }

    /// `spec.md` §4.E `getState`: `WorkspaceNotFound` if the directory is
    /// missing, `WorkspaceNotDeployed` if the state file is missing.
    pub fn get_state(&self, name: &str) -> Result<WorkspaceState, WorkspaceError> {
        if !self.dir(name).is_dir() {
            return Err(WorkspaceError::NotFound(name.to_string()));
        }
        let path = self.state_path(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(WorkspaceError::NotDeployed(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic update of the state file's `rootHash` + `rootUpdatedAt`.
    pub fn set_root(&self, name: &str, new_root: Hash) -> Result<WorkspaceState, WorkspaceError> {
        let mut state = self.get_state(name)?;
        state.root_hash = new_root;
        state.root_updated_at = Utc::now();
        self.write_state_atomic(name, &state)?;
        Ok(state)
    }

    /// Remove the workspace directory under the `removal` operation lock.
    pub fn remove(&self, name: &str) -> Result<(), WorkspaceError> {
        let holder = current_holder(format!("e3 remove {name}"));
        let handle = self.locks.acquire(name, LockOperation::Removal, holder)?;
        let result = (|| -> Result<(), WorkspaceError> {
            let dir = self.dir(name);
            if dir.is_dir() {
                fs::remove_dir_all(&dir)?;
            }
            Ok(())
        })();
        handle.release();
        result
    }

    /// List every workspace directory under the store root.
    pub fn list(&self) -> Result<Vec<String>, WorkspaceError> {
        let mut out = Vec::new();
        if !self.root.is_dir() {
            return Ok(out);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                out.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Package the current root tree and everything reachable from it
    /// into a self-contained zip (`spec.md` §4.E `export`).
    pub fn export(&self, name: &str) -> Result<Vec<u8>, WorkspaceError> {
        let state = self.get_state(name)?;
        let closure = gc::mark(&self.objects, [state.root_hash.clone()]);
        let manifest = serde_json::to_vec(&state)?;
        let zip = archive::build(&self.objects, closure, ("manifest.json", &manifest))?;
        Ok(zip)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
