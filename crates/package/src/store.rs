// SPDX-License-Identifier: MIT

//! Package ingestion and `name@version` resolution (`spec.md` §4.D).

use crate::error::PackageError;
use crate::model::{PackageInfo, PackageManifest, PackageObject, TaskObject};
use crate::version::Version;
use e3_core::Hash;
use e3_store::{archive, gc, ObjectStore};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const MANIFEST_ENTRY: &str = "manifest.json";

/// Content-addressed package store: `objects/` (shared with every other
/// component) plus `<repo>/packages/<name>/<version>` ref files.
#[derive(Debug, Clone)]
pub struct PackageStore {
    objects: ObjectStore,
    root: PathBuf,
}

impl PackageStore {
    pub fn open(objects: ObjectStore, root: impl Into<PathBuf>) -> Result<Self, PackageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { objects, root })
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    fn ref_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    /// Import a package zip (`spec.md` §6.3): every `objects/...` entry
    /// plus one `manifest.json` naming the package root. Re-import of an
    /// identical `(name, version, hash)` is a no-op; a conflicting hash is
    /// an error unless `force` is set.
    pub fn import(&self, zip_bytes: &[u8], force: bool) -> Result<PackageInfo, PackageError> {
        let parsed = archive::parse(zip_bytes)?;
        let manifest_bytes = parsed
            .extra
            .get(MANIFEST_ENTRY)
            .ok_or_else(|| PackageError::Invalid(format!("zip is missing {MANIFEST_ENTRY}")))?;
        let manifest: PackageManifest = serde_json::from_slice(manifest_bytes)?;

        archive::import_objects(&self.objects, &parsed.objects)?;

        let package: PackageObject = self.load(&manifest.hash)?;
        if package.name != manifest.name || package.version != manifest.version {
            return Err(PackageError::Invalid(format!(
                "manifest names {}@{} but the root package object is {}@{}",
                manifest.name, manifest.version, package.name, package.version
            )));
        }

        let closure = self.closure_of(&package)?;
        let imported: HashSet<Hash> = parsed.objects.iter().map(|(h, _)| h.clone()).collect();
        for hash in &closure {
            if !imported.contains(hash) && !self.objects.exists(hash) {
                return Err(PackageError::Invalid(format!(
                    "zip is missing object {hash} from the package's transitive closure"
                )));
            }
        }

        let ref_path = self.ref_path(&manifest.name, &manifest.version);
        if let Ok(existing_hex) = fs::read_to_string(&ref_path) {
            let existing: Hash = existing_hex.trim().parse()?;
            if existing == manifest.hash {
                return Ok(self.info_for(&manifest.name, &manifest.version, &existing, &ref_path)?);
            }
            if !force {
                return Err(PackageError::AlreadyExists {
                    name: manifest.name,
                    version: manifest.version,
                    existing,
                    incoming: manifest.hash,
                });
            }
        }

        if let Some(parent) = ref_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = ref_path.with_extension(format!("{}.partial", uuid::Uuid::new_v4()));
        fs::write(&tmp_path, manifest.hash.as_str())?;
        fs::rename(&tmp_path, &ref_path)?;

        info!(name = %manifest.name, version = %manifest.version, hash = %manifest.hash, "imported package");
        self.info_for(&manifest.name, &manifest.version, &manifest.hash, &ref_path)
    }

    fn info_for(&self, name: &str, version: &str, hash: &Hash, ref_path: &Path) -> Result<PackageInfo, PackageError> {
        let imported_at = fs::metadata(ref_path)?.modified()?.into();
        Ok(PackageInfo {
            name: name.to_string(),
            version: version.to_string(),
            hash: hash.clone(),
            imported_at,
        })
    }

    /// The transitive closure of hashes a package's zip must contain:
    /// the package object itself, every blob reachable from its datasets
    /// tree, and every task object it names.
    fn closure_of(&self, package: &PackageObject) -> Result<HashSet<Hash>, PackageError> {
        let mut closure = gc::mark(&self.objects, [package.datasets.clone()]);
        for task_hash in package.tasks.values() {
            closure.insert(task_hash.clone());
            // Touch the task object so a missing blob surfaces here
            // rather than surprising a later scheduler lookup.
            self.load_task(task_hash)?;
        }
        Ok(closure)
    }

    /// Resolve `name` or `name@version` to a package hash. A bare name
    /// resolves to its highest imported version; ties in that ordering
    /// are reported as ambiguous rather than picked arbitrarily.
    pub fn resolve(&self, name_or_versioned: &str) -> Result<Hash, PackageError> {
        if let Some((name, version)) = name_or_versioned.split_once('@') {
            let path = self.ref_path(name, version);
            let hex = fs::read_to_string(&path)
                .map_err(|_| PackageError::NotFound(name_or_versioned.to_string()))?;
            return Ok(hex.trim().parse()?);
        }

        let name = name_or_versioned;
        let dir = self.root.join(name);
        let mut versions = Vec::new();
        if dir.is_dir() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    let version = entry.file_name().to_string_lossy().into_owned();
                    let hex = fs::read_to_string(entry.path())?;
                    let hash: Hash = hex.trim().parse()?;
                    versions.push((Version::parse(&version), version, hash));
                }
            }
        }
        if versions.is_empty() {
            return Err(PackageError::NotFound(name.to_string()));
        }
        versions.sort_by(|a, b| a.0.cmp(&b.0));
        // Just checked `versions` is non-empty above.
        #[allow(clippy::expect_used)]
        let best = &versions.last().expect("checked non-empty above").0;
        let tied: Vec<_> = versions.iter().filter(|(v, _, _)| v == best).collect();
        if tied.len() > 1 {
            return Err(PackageError::Ambiguous {
                name: name.to_string(),
                count: tied.len(),
            });
        }
        Ok(tied[0].2.clone())
    }

    /// All imported `(name, version, hash, importedAt)` rows.
    pub fn list(&self) -> Result<Vec<PackageInfo>, PackageError> {
        let mut out = Vec::new();
        if !self.root.is_dir() {
            return Ok(out);
        }
        for name_entry in fs::read_dir(&self.root)? {
            let name_entry = name_entry?;
            if !name_entry.file_type()?.is_dir() {
                continue;
            }
            let name = name_entry.file_name().to_string_lossy().into_owned();
            for version_entry in fs::read_dir(name_entry.path())? {
                let version_entry = version_entry?;
                if !version_entry.file_type()?.is_file() {
                    continue;
                }
                let version = version_entry.file_name().to_string_lossy().into_owned();
                let hex = fs::read_to_string(version_entry.path())?;
                let hash: Hash = hex.trim().parse()?;
                out.push(self.info_for(&name, &version, &hash, &version_entry.path())?);
            }
        }
        out.sort_by(|a, b| (a.name.as_str(), a.version.as_str()).cmp(&(b.name.as_str(), b.version.as_str())));
        Ok(out)
    }

    pub fn load(&self, hash: &Hash) -> Result<PackageObject, PackageError> {
        let bytes = self.objects.read(hash)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn load_task(&self, hash: &Hash) -> Result<TaskObject, PackageError> {
        let bytes = self.objects.read(hash)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
