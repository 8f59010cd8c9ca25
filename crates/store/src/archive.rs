// SPDX-License-Identifier: MIT

//! Self-contained zip archives of an object-store closure (`spec.md`
//! §6.3 "package zip"; §4.E `export`). Shared by `e3-package` (package
//! import/resolution) and `e3-workspace` (workspace export), since both
//! need the same "bundle a set of content-addressed blobs plus one small
//! root-pointer entry" shape.
//!
//! Every entry under `objects/` must be named the SHA-256 of its own
//! contents, sharded the same way the object store lays blobs out on
//! disk. A single extra entry (conventionally `manifest.json`, name
//! chosen by the caller) carries whatever small amount of root-pointer
//! metadata the format needs — the archive's root blob is never inferred
//! by sniffing entry contents.

use crate::objects::{ObjectStore, StoreError};
use e3_core::Hash;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Bundle `hashes` (already the full closure the caller wants shipped)
/// plus one extra named entry into a zip, in memory.
pub fn build(
    store: &ObjectStore,
    hashes: impl IntoIterator<Item = Hash>,
    extra_entry: (&str, &[u8]),
) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    {
        let mut writer = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();
        for hash in hashes {
            let bytes = store.read(&hash)?;
            let (prefix, rest) = hash.shard_path();
            writer.start_file(format!("objects/{prefix}/{rest}"), options)?;
            writer.write_all(&bytes)?;
        }
        let (name, bytes) = extra_entry;
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
        writer.finish()?;
    }
    Ok(buf)
}

/// One imported `objects/<xx>/<yyyy...>` entry and the extra named entry,
/// if the zip carries it.
pub struct Parsed {
    pub objects: Vec<(Hash, Vec<u8>)>,
    pub extra: BTreeMap<String, Vec<u8>>,
}

/// Parse a zip's entries without touching the object store: verifies
/// every `objects/...` entry's name is the SHA-256 of its own bytes.
pub fn parse(zip_bytes: &[u8]) -> Result<Parsed, StoreError> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))?;
    let mut objects = Vec::new();
    let mut extra = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        match name.strip_prefix("objects/") {
            Some(shard_path) => {
                let expected: Hash = shard_path
                    .replace('/', "")
                    .parse()
                    .map_err(|_| StoreError::Io(std::io::Error::other(format!("malformed object entry name {name:?}"))))?;
                let actual = Hash::of_bytes(&bytes);
                if actual != expected {
                    return Err(StoreError::Integrity {
                        hash: expected,
                        actual,
                    });
                }
                objects.push((expected, bytes));
            }
            None => {
                extra.insert(name, bytes);
            }
        }
    }
    Ok(Parsed { objects, extra })
}

/// Import every parsed object entry into `store`, returning the set of
/// hashes now present (whether freshly written or already there).
pub fn import_objects(store: &ObjectStore, objects: &[(Hash, Vec<u8>)]) -> Result<(), StoreError> {
    for (expected, bytes) in objects {
        let written = store.write(bytes)?;
        debug_assert_eq!(&written, expected);
    }
    Ok(())
}

impl From<zip::result::ZipError> for StoreError {
    fn from(e: zip::result::ZipError) -> Self {
        StoreError::Io(std::io::Error::other(e))
    }
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
