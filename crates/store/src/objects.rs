// SPDX-License-Identifier: MIT

//! Content-addressed object store: `<root>/<xx>/<yyyy...>` shards, written
//! through a temporary sibling and renamed into place.

use e3_core::Hash;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("integrity check failed for {hash}: content rehashes to {actual}")]
    Integrity { hash: Hash, actual: Hash },
    #[error("invalid hash: {0}")]
    InvalidHash(#[from] e3_core::hash::InvalidHash),
}

impl e3_core::HasErrorKind for StoreError {
    fn kind(&self) -> e3_core::ErrorKind {
        match self {
            StoreError::Io(_) => e3_core::ErrorKind::Storage,
            StoreError::Integrity { .. } => e3_core::ErrorKind::Integrity,
            StoreError::InvalidHash(_) => e3_core::ErrorKind::Invalid,
        }
    }
}

/// A single, shallow object store rooted at `<repo>/objects`.
///
/// Cheap to clone: just the root path.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// Open (creating if absent) an object store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard_dir(&self, hash: &Hash) -> PathBuf {
        let (prefix, _) = hash.shard_path();
        self.root.join(prefix)
    }

    /// Absolute path of a blob's shard slot, written or not.
    pub fn path_for(&self, hash: &Hash) -> PathBuf {
        let (prefix, rest) = hash.shard_path();
        self.root.join(prefix).join(rest)
    }

    /// Write `bytes`, returning its hash. Idempotent: a second write of
    /// identical content is a cheap no-op.
    pub fn write(&self, bytes: &[u8]) -> Result<Hash, StoreError> {
        let hash = Hash::of_bytes(bytes);
        self.write_at(&hash, bytes)?;
        Ok(hash)
    }

    /// Digest a stream while writing it through a temp file, never
    /// buffering the whole source in memory.
    pub fn write_stream(&self, mut source: impl Read) -> Result<Hash, StoreError> {
        let dir = &self.root;
        fs::create_dir_all(dir)?;
        let tmp_path = dir.join(format!(".{}.partial", uuid::Uuid::new_v4()));
        {
            let mut tmp = File::create(&tmp_path)?;
            std::io::copy(&mut source, &mut tmp)?;
            tmp.sync_all()?;
        }
        // Hash the temp file back rather than the caller's stream directly,
        // so a failing mid-stream write never leaves a half-hashed blob.
        let hash = Hash::of_reader(File::open(&tmp_path)?)?;
        let final_path = self.path_for(&hash);
        if final_path.exists() {
            fs::remove_file(&tmp_path)?;
            return Ok(hash);
        }
        fs::create_dir_all(self.shard_dir(&hash))?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(hash)
    }

    fn write_at(&self, hash: &Hash, bytes: &[u8]) -> Result<(), StoreError> {
        let final_path = self.path_for(hash);
        if final_path.exists() {
            return Ok(());
        }
        let dir = self.shard_dir(hash);
        fs::create_dir_all(&dir)?;
        let tmp_path = dir.join(format!("{}.partial", uuid::Uuid::new_v4()));
        {
            let mut tmp = File::create(&tmp_path)?;
            std::io::Write::write_all(&mut tmp, bytes)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Read a blob back, verifying its content still hashes to `hash`.
    pub fn read(&self, hash: &Hash) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(hash);
        let bytes = fs::read(&path)?;
        let actual = Hash::of_bytes(&bytes);
        if &actual != hash {
            return Err(StoreError::Integrity {
                hash: hash.clone(),
                actual,
            });
        }
        Ok(bytes)
    }

    pub fn exists(&self, hash: &Hash) -> bool {
        self.path_for(hash).is_file()
    }

    pub fn abbrev<'a>(&self, hash: &'a Hash, n: usize) -> &'a str {
        hash.abbrev(n)
    }

    /// Permanently delete a blob. Used only by the garbage collector.
    pub fn delete(&self, hash: &Hash) -> Result<(), StoreError> {
        let path = self.path_for(hash);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// File system modification time of a stored blob, for GC age checks.
    pub fn modified_at(&self, hash: &Hash) -> Result<std::time::SystemTime, StoreError> {
        Ok(fs::metadata(self.path_for(hash))?.modified()?)
    }

    /// Enumerate every hash currently present in the store, walking the
    /// two-level shard layout.
    pub fn iter_hashes(&self) -> Result<Vec<Hash>, StoreError> {
        let mut hashes = Vec::new();
        if !self.root.is_dir() {
            return Ok(hashes);
        }
        for shard_entry in fs::read_dir(&self.root)? {
            let shard_entry = shard_entry?;
            if !shard_entry.file_type()?.is_dir() {
                continue;
            }
            let prefix = shard_entry.file_name().to_string_lossy().into_owned();
            if prefix.len() != 2 {
                continue;
            }
            for obj_entry in fs::read_dir(shard_entry.path())? {
                let obj_entry = obj_entry?;
                if !obj_entry.file_type()?.is_file() {
                    continue;
                }
                let name = obj_entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".partial") {
                    continue;
                }
                if let Ok(hash) = format!("{prefix}{name}").parse::<Hash>() {
                    hashes.push(hash);
                }
            }
        }
        Ok(hashes)
    }

    /// Orphan `*.partial` temp files left behind by a crashed writer,
    /// paired with their modification time for age filtering.
    pub fn iter_partials(&self) -> Result<Vec<(PathBuf, std::time::SystemTime)>, StoreError> {
        let mut out = Vec::new();
        if !self.root.is_dir() {
            return Ok(out);
        }
        for entry in walk_files(&self.root)? {
            let name = entry.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.ends_with(".partial") {
                let modified = fs::metadata(&entry)?.modified()?;
                out.push((entry, modified));
            }
        }
        Ok(out)
    }
}

fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            out.extend(walk_files(&path)?);
        } else {
            out.push(path);
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "objects_tests.rs"]
mod tests;
