// SPDX-License-Identifier: MIT

//! Execution record store (`spec.md` §4.G): one status file per
//! `(taskHash, inputsHash)` pair, written atomically, with
//! `(pid, pidStartTime, bootId)` crash detection for stale `running`
//! records — the same liveness triple `e3_workspace::lock` uses for the
//! workspace lock, applied here to individual task executions.

use chrono::{DateTime, Utc};
use e3_core::Hash;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionRecordError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed execution record: {0}")]
    Codec(#[from] serde_json::Error),
}

impl e3_core::HasErrorKind for ExecutionRecordError {
    fn kind(&self) -> e3_core::ErrorKind {
        match self {
            ExecutionRecordError::Io(_) => e3_core::ErrorKind::Storage,
            ExecutionRecordError::Codec(_) => e3_core::ErrorKind::Codec,
        }
    }
}

/// `(pid, pidStartTime, bootId)` liveness triple a `running` record
/// carries so a later execution can tell whether its owner crashed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessLiveness {
    pub pid: u32,
    pub pid_start_time: u64,
    pub boot_id: String,
}

impl ProcessLiveness {
    /// Capture the current process's liveness triple.
    pub fn current() -> Self {
        let mut sys = sysinfo::System::new_all();
        sys.refresh_all();
        let pid = std::process::id();
        let pid_start_time = sys
            .process(sysinfo::Pid::from_u32(pid))
            .map(|p| p.start_time())
            .unwrap_or(0);
        Self {
            pid,
            pid_start_time,
            boot_id: e3_workspace::boot_id(),
        }
    }

    /// True iff a live process still matches this triple exactly.
    pub fn is_alive(&self) -> bool {
        if self.boot_id != e3_workspace::boot_id() {
            return false;
        }
        let mut sys = sysinfo::System::new_all();
        sys.refresh_all();
        match sys.process(sysinfo::Pid::from_u32(self.pid)) {
            Some(p) => p.start_time() == self.pid_start_time,
            None => false,
        }
    }
}

/// The status of one `(taskHash, inputsHash)` execution (`spec.md` §3,
/// §4.G).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionRecord {
    Running {
        execution_id: String,
        input_hashes: Vec<Hash>,
        started_at: DateTime<Utc>,
        #[serde(flatten)]
        liveness: ProcessLiveness,
    },
    Success {
        execution_id: String,
        input_hashes: Vec<Hash>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        output_hash: Hash,
    },
    Failed {
        execution_id: String,
        input_hashes: Vec<Hash>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        exit_code: i32,
    },
    Error {
        execution_id: String,
        input_hashes: Vec<Hash>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        message: String,
    },
}

impl ExecutionRecord {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionRecord::Running { .. })
    }

    /// The cached output hash, if this is a `success` record.
    pub fn cached_output(&self) -> Option<&Hash> {
        match self {
            ExecutionRecord::Success { output_hash, .. } => Some(output_hash),
            _ => None,
        }
    }
}

/// `inputsHash = H(concat(sort(inputHashes)))` (`spec.md` §3).
pub fn inputs_hash(input_hashes: &[Hash]) -> Hash {
    let mut sorted: Vec<&str> = input_hashes.iter().map(Hash::as_str).collect();
    sorted.sort_unstable();
    Hash::of_bytes(sorted.concat().as_bytes())
}

/// `<repo>/executions/<taskHash>/<inputsHash>`: status files for one
/// `(taskHash, inputsHash)` execution.
#[derive(Debug, Clone)]
pub struct ExecutionRecordStore {
    root: PathBuf,
}

impl ExecutionRecordStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, task_hash: &Hash, inputs_hash: &Hash) -> PathBuf {
        self.root.join(task_hash.as_str()).join(inputs_hash.as_str())
    }

    fn status_path(&self, task_hash: &Hash, inputs_hash: &Hash) -> PathBuf {
        self.dir(task_hash, inputs_hash).join("status")
    }

    /// Read the current record, if any.
    pub fn read(&self, task_hash: &Hash, inputs_hash: &Hash) -> Result<Option<ExecutionRecord>, ExecutionRecordError> {
        let path = self.status_path(task_hash, inputs_hash);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write (temp + rename), matching every other blob/state write
    /// in this repository.
    pub fn write(&self, task_hash: &Hash, inputs_hash: &Hash, record: &ExecutionRecord) -> Result<(), ExecutionRecordError> {
        let dir = self.dir(task_hash, inputs_hash);
        fs::create_dir_all(&dir)?;
        let path = self.status_path(task_hash, inputs_hash);
        let tmp = dir.join(format!("status.{}.partial", uuid::Uuid::new_v4()));
        fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Look up the most recent *terminal* status for cache purposes
    /// (`spec.md` §4.G "Cache lookup").
    pub fn cached_success(&self, task_hash: &Hash, inputs_hash: &Hash) -> Result<Option<Hash>, ExecutionRecordError> {
        Ok(self
            .read(task_hash, inputs_hash)?
            .filter(|r| r.is_terminal())
            .and_then(|r| r.cached_output().cloned()))
    }

    /// True iff a `running` record exists and its liveness triple no
    /// longer matches a live process — the scheduler may overwrite it.
    pub fn is_stale_running(&self, task_hash: &Hash, inputs_hash: &Hash) -> Result<bool, ExecutionRecordError> {
        match self.read(task_hash, inputs_hash)? {
            Some(ExecutionRecord::Running { liveness, .. }) => Ok(!liveness.is_alive()),
            _ => Ok(false),
        }
    }

    /// Every `(taskHash, inputsHash, record)` currently on disk, for the
    /// garbage collector's running-execution live-root scan.
    pub fn iter_all(&self) -> Result<Vec<(Hash, Hash, ExecutionRecord)>, ExecutionRecordError> {
        let mut out = Vec::new();
        if !self.root.is_dir() {
            return Ok(out);
        }
        for task_entry in fs::read_dir(&self.root)? {
            let task_entry = task_entry?;
            if !task_entry.file_type()?.is_dir() {
                continue;
            }
            let Ok(task_hash) = task_entry.file_name().to_string_lossy().parse::<Hash>() else {
                continue;
            };
            for inputs_entry in fs::read_dir(task_entry.path())? {
                let inputs_entry = inputs_entry?;
                if !inputs_entry.file_type()?.is_dir() {
                    continue;
                }
                let Ok(inputs_hash) = inputs_entry.file_name().to_string_lossy().parse::<Hash>() else {
                    continue;
                };
                if let Some(record) = self.read(&task_hash, &inputs_hash)? {
                    out.push((task_hash.clone(), inputs_hash, record));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "execution_record_tests.rs"]
mod tests;
