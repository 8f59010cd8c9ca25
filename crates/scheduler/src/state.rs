// SPDX-License-Identifier: MIT

//! The in-memory/persisted shape of one dataflow execution (`spec.md`
//! §3 "Dataflow execution state"). This is what [`crate::state_store`]
//! snapshots and [`crate::scheduler::Scheduler`] mutates.

use chrono::{DateTime, Utc};
use e3_core::{DataflowStatus, ExecutionEvent, ExecutionId, Hash, TaskStatus};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-task bookkeeping within one execution (`spec.md` §3 `TaskState`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub status: TaskStatus,
    pub deps: Vec<String>,
    pub inputs_hash: Option<Hash>,
    pub output_hash: Option<Hash>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskState {
    pub fn pending(deps: Vec<String>) -> Self {
        Self {
            status: TaskStatus::Pending,
            deps,
            inputs_hash: None,
            output_hash: None,
            exit_code: None,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// One live dataflow execution over a workspace (`spec.md` §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataflowState {
    pub id: ExecutionId,
    /// A display-only label for the repo the execution runs against
    /// (e.g. its root path); the scheduler itself only ever deals with
    /// already-open stores, never re-resolves this.
    pub repo: String,
    pub workspace: String,
    pub started_at: DateTime<Utc>,
    pub concurrency: usize,
    pub force: bool,
    pub filter: Option<Vec<String>>,
    /// Content hash of the planned graph; resume is only valid when a
    /// freshly planned graph hashes the same (`spec.md` §4.J "Resume").
    pub graph_hash: Hash,
    pub tasks: IndexMap<String, TaskState>,
    pub executed: u64,
    pub cached: u64,
    pub failed: u64,
    pub skipped: u64,
    pub status: DataflowStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub events: Vec<ExecutionEvent>,
    pub event_seq: u64,
}

impl DataflowState {
    /// `spec.md` §8 property 5 "mass conservation": no task left in a
    /// non-terminal status.
    pub fn is_settled(&self) -> bool {
        self.tasks.values().all(|t| t.status.is_terminal())
    }

    pub fn task_names_with_status(&self, status: TaskStatus) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|(_, t)| t.status == status)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// A compact summary for `orchestrator.getStatus` (`spec.md` §4.K).
    pub fn summary(&self) -> StatusSummary {
        StatusSummary {
            id: self.id.clone(),
            workspace: self.workspace.clone(),
            status: self.status,
            completed: self.task_names_with_status(TaskStatus::Completed),
            running: self.task_names_with_status(TaskStatus::InProgress),
            pending: {
                let mut v = self.task_names_with_status(TaskStatus::Pending);
                v.extend(self.task_names_with_status(TaskStatus::Ready));
                v
            },
            failed: self.task_names_with_status(TaskStatus::Failed),
            skipped: self.task_names_with_status(TaskStatus::Skipped),
            executed: self.executed,
            cached: self.cached,
            error: self.error.clone(),
        }
    }
}

/// `spec.md` §6.5 `getStatus` return shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSummary {
    pub id: ExecutionId,
    pub workspace: String,
    pub status: DataflowStatus,
    pub completed: Vec<String>,
    pub running: Vec<String>,
    pub pending: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub executed: u64,
    pub cached: u64,
    pub error: Option<String>,
}

/// `spec.md` §6.5 `wait` return shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaitOutcome {
    pub success: bool,
    pub executed: u64,
    pub cached: u64,
    pub failed: u64,
    pub skipped: u64,
    pub duration_ms: u64,
}

impl From<&DataflowState> for WaitOutcome {
    fn from(state: &DataflowState) -> Self {
        let duration_ms = state
            .completed_at
            .map(|end| (end - state.started_at).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        Self {
            success: state.status == DataflowStatus::Completed,
            executed: state.executed,
            cached: state.cached,
            failed: state.failed,
            skipped: state.skipped,
            duration_ms,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
