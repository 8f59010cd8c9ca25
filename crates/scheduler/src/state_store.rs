// SPDX-License-Identifier: MIT

//! Persistence for [`DataflowState`] (`spec.md` §4.J "State persistence":
//! "Two backends satisfy the store interface: a file-based store ... and
//! an in-memory store (tests)"). The file backend pairs a `zstd`-compressed
//! JSON snapshot — written temp-file + rename, the same atomicity every
//! other piece of durable state in this repository uses — with the
//! [`crate::eventlog::EventLog`] JSONL append log, grounded on the
//! teacher's `Checkpointer`/`Wal` pair (`crates/storage/src/checkpoint.rs`,
//! `wal.rs`). Unlike the teacher's background-thread checkpointer, spec.md
//! §4.J requires persistence after *every* event append with no caller-
//! observable suspension beyond that — there's no batching window to hide
//! I/O in, so the snapshot write here happens synchronously on the calling
//! task instead of being handed to a background thread.

use crate::eventlog::{EventLog, EventLogError};
use crate::state::DataflowState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed dataflow snapshot: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("snapshot decompression failed: {0}")]
    Compression(String),
    #[error(transparent)]
    EventLog(#[from] EventLogError),
}

impl e3_core::HasErrorKind for StateStoreError {
    fn kind(&self) -> e3_core::ErrorKind {
        match self {
            StateStoreError::Io(_) => e3_core::ErrorKind::Storage,
            StateStoreError::Codec(_) => e3_core::ErrorKind::Codec,
            StateStoreError::Compression(_) => e3_core::ErrorKind::Storage,
            StateStoreError::EventLog(e) => e3_core::HasErrorKind::kind(e),
        }
    }
}

/// Persists [`DataflowState`] snapshots and exposes the durable event log
/// a running execution appends to.
pub trait DataflowStateStore: Send + Sync {
    fn load(&self, workspace: &str) -> Result<Option<DataflowState>, StateStoreError>;
    fn persist(&self, state: &DataflowState) -> Result<(), StateStoreError>;
    /// Open (or continue appending to) the durable event log for
    /// `workspace`'s currently running execution.
    fn open_event_log(&self, workspace: &str) -> Result<EventLog, StateStoreError>;
}

/// File-based backend: `<repo>/workspaces/<name>/dataflow/{snapshot.zst,
/// events.jsonl}`.
#[derive(Debug, Clone)]
pub struct FileDataflowStateStore {
    workspaces_root: PathBuf,
}

impl FileDataflowStateStore {
    pub fn new(workspaces_root: impl Into<PathBuf>) -> Self {
        Self {
            workspaces_root: workspaces_root.into(),
        }
    }

    fn dir(&self, workspace: &str) -> PathBuf {
        self.workspaces_root.join(workspace).join("dataflow")
    }

    fn snapshot_path(&self, workspace: &str) -> PathBuf {
        self.dir(workspace).join("snapshot.zst")
    }

    fn events_path(&self, workspace: &str) -> PathBuf {
        self.dir(workspace).join("events.jsonl")
    }

    /// A corrupt snapshot is rotated to `.bak` and treated as absent,
    /// matching `crate::eventlog::EventLog::open`'s recovery behaviour
    /// for the JSONL log.
    fn load_snapshot_or_quarantine(&self, path: &Path) -> Result<Option<DataflowState>, StateStoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let compressed = fs::read(path)?;
        let decoded = match zstd::stream::decode_all(compressed.as_slice()) {
            Ok(bytes) => bytes,
            Err(e) => {
                quarantine(path)?;
                return Err(StateStoreError::Compression(e.to_string()));
            }
        };
        match serde_json::from_slice(&decoded) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                quarantine(path)?;
                Err(e.into())
            }
        }
    }
}

fn quarantine(path: &Path) -> Result<(), StateStoreError> {
    let bak = crate::eventlog::rotate_bak_path(path);
    fs::rename(path, bak)?;
    Ok(())
}

impl DataflowStateStore for FileDataflowStateStore {
    fn load(&self, workspace: &str) -> Result<Option<DataflowState>, StateStoreError> {
        self.load_snapshot_or_quarantine(&self.snapshot_path(workspace))
    }

    fn persist(&self, state: &DataflowState) -> Result<(), StateStoreError> {
        let dir = self.dir(&state.workspace);
        fs::create_dir_all(&dir)?;
        let path = self.snapshot_path(&state.workspace);
        let json = serde_json::to_vec(state)?;
        let compressed =
            zstd::encode_all(json.as_slice(), 3).map_err(|e| StateStoreError::Compression(e.to_string()))?;
        let tmp = dir.join(format!("snapshot.{}.partial", uuid::Uuid::new_v4()));
        {
            let mut tmp_file = fs::File::create(&tmp)?;
            io::Write::write_all(&mut tmp_file, &compressed)?;
            tmp_file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        if let Ok(dir_file) = fs::File::open(&dir) {
            let _ = dir_file.sync_all();
        }
        Ok(())
    }

    fn open_event_log(&self, workspace: &str) -> Result<EventLog, StateStoreError> {
        Ok(EventLog::open(self.events_path(workspace))?)
    }
}

/// In-memory backend for deterministic scheduler tests (`spec.md` §4.J).
#[derive(Default)]
pub struct InMemoryDataflowStateStore {
    snapshots: Mutex<HashMap<String, DataflowState>>,
    logs_dir: Option<PathBuf>,
}

impl InMemoryDataflowStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event logs still need a filesystem home (they're a JSONL file);
    /// tests that want durability semantics for the log but an in-memory
    /// snapshot point this at a `tempfile::tempdir()`.
    pub fn with_logs_dir(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshots: Mutex::new(HashMap::new()),
            logs_dir: Some(logs_dir.into()),
        }
    }
}

impl DataflowStateStore for InMemoryDataflowStateStore {
    fn load(&self, workspace: &str) -> Result<Option<DataflowState>, StateStoreError> {
        Ok(self.snapshots.lock().get(workspace).cloned())
    }

    fn persist(&self, state: &DataflowState) -> Result<(), StateStoreError> {
        self.snapshots.lock().insert(state.workspace.clone(), state.clone());
        Ok(())
    }

    fn open_event_log(&self, workspace: &str) -> Result<EventLog, StateStoreError> {
        let dir = self
            .logs_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        Ok(EventLog::open(dir.join(format!("{workspace}.events.jsonl")))?)
    }
}

#[cfg(test)]
#[path = "state_store_tests.rs"]
mod tests;
