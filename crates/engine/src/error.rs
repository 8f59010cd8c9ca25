// SPDX-License-Identifier: MIT

use e3_core::{ErrorKind, HasErrorKind};
use thiserror::Error;

/// The union error type every `e3-engine` operation returns (`spec.md`
/// §7): every component boundary's own error, plus the handful of
/// failure modes that only exist at the orchestrator layer itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no e3 repository found at the given path, $E3_REPO, the current directory or its ancestors, or ~/.e3")]
    RepoNotFound,
    #[error("could not determine a home directory for the ~/.e3 discovery fallback")]
    NoHomeDir,
    #[error("{0:?} is not a valid e3 repository (missing one of objects/, packages/, workspaces/, executions/, tmp/)")]
    InvalidRepo(std::path::PathBuf),
    #[error("repository already initialized at {0:?}")]
    AlreadyInitialized(std::path::PathBuf),
    #[error("no execution is currently running for workspace {0:?}")]
    NotRunning(String),
    #[error("background execution task for workspace {workspace:?} panicked: {detail}")]
    Join { workspace: String, detail: String },
    #[error(transparent)]
    Workspace(#[from] e3_workspace::WorkspaceError),
    #[error(transparent)]
    Lock(#[from] e3_workspace::LockError),
    #[error(transparent)]
    Package(#[from] e3_package::PackageError),
    #[error(transparent)]
    Store(#[from] e3_store::StoreError),
    #[error(transparent)]
    Tree(#[from] e3_store::TreeError),
    #[error(transparent)]
    Scheduler(#[from] e3_scheduler::SchedulerError),
    #[error(transparent)]
    StateStore(#[from] e3_scheduler::StateStoreError),
    #[error(transparent)]
    EventLog(#[from] e3_scheduler::EventLogError),
    #[error(transparent)]
    ExecutionRecord(#[from] e3_scheduler::ExecutionRecordError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HasErrorKind for EngineError {
    fn kind(&self) -> ErrorKind {
        match self {
            EngineError::RepoNotFound => ErrorKind::NotFound,
            EngineError::NoHomeDir => ErrorKind::NotFound,
            EngineError::InvalidRepo(_) => ErrorKind::Invalid,
            EngineError::AlreadyInitialized(_) => ErrorKind::AlreadyExists,
            EngineError::NotRunning(_) => ErrorKind::NotFound,
            EngineError::Join { .. } => ErrorKind::Storage,
            EngineError::Workspace(e) => e.kind(),
            EngineError::Lock(e) => e.kind(),
            EngineError::Package(e) => e.kind(),
            EngineError::Store(e) => e.kind(),
            EngineError::Tree(e) => e.kind(),
            EngineError::Scheduler(e) => e.kind(),
            EngineError::StateStore(e) => e.kind(),
            EngineError::EventLog(e) => e.kind(),
            EngineError::ExecutionRecord(e) => e.kind(),
            EngineError::Io(_) => ErrorKind::Storage,
        }
    }
}
