// SPDX-License-Identifier: MIT

//! Per-workspace advisory lock with crash detection (`spec.md` §4.F).
//!
//! One lock file per workspace: `<repo>/workspaces/<name>.lock`. The
//! acquirer creates it exclusively (create-if-not-exists) and takes an OS
//! advisory exclusive lock on the descriptor, the way
//! `oj-daemon::lifecycle::startup_inner` guards its single PID file with
//! `fs2::FileExt::try_lock_exclusive`. A lock whose recorded
//! `(pid, boot_id, start_time)` no longer matches a live process is dead
//! and is forcibly replaced — `oj-cli::daemon_process::process_exists`
//! generalized from bare PID liveness (`kill -0`) to the full triple so a
//! rebooted node's stale lock is reclaimable without a watchdog.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use sysinfo::{Pid, System};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockOperation {
    Deployment,
    Removal,
    Dataflow,
}

impl std::fmt::Display for LockOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LockOperation::Deployment => "deployment",
            LockOperation::Removal => "removal",
            LockOperation::Dataflow => "dataflow",
        };
        write!(f, "{s}")
    }
}

/// The opaque, text-encoded holder identity (`spec.md` §4.F).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockHolder {
    Process {
        pid: u32,
        boot_id: String,
        /// Process start time in seconds since boot, per `sysinfo`.
        start_time: u64,
        command: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockState {
    pub operation: LockOperation,
    pub holder: LockHolder,
    pub acquired_at: DateTime<Utc>,
    /// TTL-based unlocking for cloud deployments; ignored by this local
    /// implementation (`spec.md` §4.F).
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("workspace {workspace:?} is locked for {operation} by {holder:?}")]
    Locked {
        workspace: String,
        operation: LockOperation,
        holder: LockHolder,
    },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed lock file: {0}")]
    Codec(#[from] serde_json::Error),
}

impl e3_core::HasErrorKind for LockError {
    fn kind(&self) -> e3_core::ErrorKind {
        match self {
            LockError::Locked { .. } => e3_core::ErrorKind::Locked,
            LockError::Io(_) => e3_core::ErrorKind::Storage,
            LockError::Codec(_) => e3_core::ErrorKind::Codec,
        }
    }
}

/// An acquired lock. Releases (deletes the lock file) on drop.
pub struct LockHandle {
    path: PathBuf,
    _file: File,
    released: bool,
}

impl LockHandle {
    pub fn release(mut self) {
        self.do_release();
    }

    fn do_release(&mut self) {
        if self.released {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to release workspace lock"),
        }
        self.released = true;
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.do_release();
    }
}

/// Current system boot id, for crash detection. Linux reads the kernel's
/// own boot id; other platforms fall back to a fixed constant, meaning a
/// reboot there doesn't by itself reclaim a stale lock — a documented
/// trade-off of running this lock service off-Linux.
pub fn boot_id() -> String {
    #[cfg(target_os = "linux")]
    {
        fs::read_to_string("/proc/sys/kernel/random/boot_id")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "unknown-boot-id".to_string())
    }
    #[cfg(not(target_os = "linux"))]
    {
        "unknown-boot-id".to_string()
    }
}

fn current_process_start_time(sys: &System, pid: u32) -> Option<u64> {
    sys.process(Pid::from_u32(pid)).map(|p| p.start_time())
}

/// Build the holder identity for the current process.
pub fn current_holder(command: impl Into<String>) -> LockHolder {
    let mut sys = System::new_all();
    sys.refresh_all();
    let pid = std::process::id();
    let start_time = current_process_start_time(&sys, pid).unwrap_or(0);
    LockHolder::Process {
        pid,
        boot_id: boot_id(),
        start_time,
        command: command.into(),
    }
}

fn holder_is_alive(holder: &LockHolder) -> bool {
    match holder {
        LockHolder::Process {
            pid,
            boot_id: recorded_boot_id,
            start_time,
            ..
        } => {
            if *recorded_boot_id != boot_id() {
                return false;
            }
            let mut sys = System::new_all();
            sys.refresh_all();
            match current_process_start_time(&sys, *pid) {
                Some(live_start) => live_start == *start_time,
                None => false,
            }
        }
    }
}

/// Advisory lock service rooted at `<repo>/workspaces`.
#[derive(Debug, Clone)]
pub struct LockService {
    root: PathBuf,
}

impl LockService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn lock_path(&self, workspace: &str) -> PathBuf {
        self.root.join(format!("{workspace}.lock"))
    }

    /// Acquire the workspace's lock for `operation`, replacing a dead
    /// holder's lock if one is found.
    pub fn acquire(
        &self,
        workspace: &str,
        operation: LockOperation,
        holder: LockHolder,
    ) -> Result<LockHandle, LockError> {
        fs::create_dir_all(&self.root)?;
        let path = self.lock_path(workspace);
        let state = LockState {
            operation,
            holder,
            acquired_at: Utc::now(),
            expires_at: None,
        };
        let bytes = serde_json::to_vec_pretty(&state)?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.try_lock_exclusive()?;
                io::Write::write_all(&mut file, &bytes)?;
                file.sync_all()?;
                Ok(LockHandle {
                    path,
                    _file: file,
                    released: false,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                self.try_replace_dead_lock(&path, workspace, &state, &bytes)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn try_replace_dead_lock(
        &self,
        path: &Path,
        workspace: &str,
        new_state: &LockState,
        new_bytes: &[u8],
    ) -> Result<LockHandle, LockError> {
        let existing_bytes = fs::read(path)?;
        let existing: LockState = serde_json::from_slice(&existing_bytes)?;
        if holder_is_alive(&existing.holder) {
            return Err(LockError::Locked {
                workspace: workspace.to_string(),
                operation: existing.operation,
                holder: existing.holder,
            });
        }

        info!(workspace, holder = ?existing.holder, "replacing dead workspace lock");
        let tmp_path = path.with_file_name(format!("{}.{}.tmp", workspace, uuid::Uuid::new_v4()));
        let mut tmp = File::create(&tmp_path)?;
        tmp.try_lock_exclusive()?;
        io::Write::write_all(&mut tmp, new_bytes)?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, path)?;
        let _ = new_state;
        Ok(LockHandle {
            path: path.to_path_buf(),
            _file: tmp,
            released: false,
        })
    }

    /// The current lock holder, if the workspace is locked right now.
    pub fn peek(&self, workspace: &str) -> Result<Option<LockState>, LockError> {
        let path = self.lock_path(workspace);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
