// SPDX-License-Identifier: MIT

use e3_core::{ErrorKind, HasErrorKind, TreePath};
use thiserror::Error;

/// Errors from building a [`crate::planner::DataflowGraph`]
/// (`spec.md` §4.I).
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("dependency cycle detected among tasks: {0:?}")]
    CycleDetected(Vec<String>),
    #[error("task {task:?} reads unknown path {path}")]
    UnknownInputPath { task: String, path: TreePath },
    #[error("tasks {first:?} and {second:?} both write output path {path}")]
    OutputPathConflict {
        first: String,
        second: String,
        path: TreePath,
    },
    #[error(transparent)]
    Package(#[from] e3_package::PackageError),
    #[error(transparent)]
    Tree(#[from] e3_store::TreeError),
    #[error(transparent)]
    Store(#[from] e3_store::StoreError),
}

impl HasErrorKind for PlannerError {
    fn kind(&self) -> ErrorKind {
        match self {
            PlannerError::CycleDetected(_) => ErrorKind::Cycle,
            PlannerError::UnknownInputPath { .. } => ErrorKind::Invalid,
            PlannerError::OutputPathConflict { .. } => ErrorKind::Invalid,
            PlannerError::Package(e) => e.kind(),
            PlannerError::Tree(e) => e.kind(),
            PlannerError::Store(e) => e.kind(),
        }
    }
}

/// Errors from driving a [`crate::scheduler::Scheduler`]
/// (`spec.md` §4.J, §7 "fatal conditions").
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error("planned graph (hash {fresh}) does not match the persisted execution's graph (hash {persisted}); restart the execution")]
    GraphDrift { persisted: String, fresh: String },
    #[error("failed to persist execution state: {0}")]
    StatePersistence(String),
    #[error("workspace lock lost mid-execution")]
    WorkspaceLockLost,
    #[error(transparent)]
    Workspace(#[from] e3_workspace::WorkspaceError),
    #[error(transparent)]
    Package(#[from] e3_package::PackageError),
    #[error(transparent)]
    Tree(#[from] e3_store::TreeError),
    #[error(transparent)]
    Store(#[from] e3_store::StoreError),
    #[error(transparent)]
    EventLog(#[from] crate::eventlog::EventLogError),
    #[error(transparent)]
    ExecutionRecord(#[from] crate::execution_record::ExecutionRecordError),
    #[error(transparent)]
    StateStore(#[from] crate::state_store::StateStoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed persisted state: {0}")]
    Codec(#[from] serde_json::Error),
}

impl HasErrorKind for SchedulerError {
    fn kind(&self) -> ErrorKind {
        match self {
            SchedulerError::Planner(e) => e.kind(),
            SchedulerError::GraphDrift { .. } => ErrorKind::GraphDrift,
            SchedulerError::StatePersistence(_) => ErrorKind::Storage,
            SchedulerError::WorkspaceLockLost => ErrorKind::LockLost,
            SchedulerError::Workspace(e) => e.kind(),
            SchedulerError::Package(e) => e.kind(),
            SchedulerError::Tree(e) => e.kind(),
            SchedulerError::Store(e) => e.kind(),
            SchedulerError::EventLog(e) => e.kind(),
            SchedulerError::ExecutionRecord(e) => e.kind(),
            SchedulerError::StateStore(e) => e.kind(),
            SchedulerError::Io(_) => ErrorKind::Storage,
            SchedulerError::Codec(_) => ErrorKind::Codec,
        }
    }
}
