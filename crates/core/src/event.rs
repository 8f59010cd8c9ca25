// SPDX-License-Identifier: MIT

//! Dataflow execution events and the task/execution status vocabulary
//! (`spec.md` §3: TaskStatus, ExecutionEvent).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single task within one dataflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Ready,
    InProgress,
    Completed,
    Failed,
    /// Terminal; caused by an upstream `Failed`.
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Ready => "ready",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Tag-only companion of [`TaskStatus`], matching the shape the rest of
/// this codebase uses for protocol DTOs that strip associated data.
pub type TaskStatusKind = TaskStatus;

/// Overall status of one dataflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataflowStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for DataflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataflowStatus::Running => "running",
            DataflowStatus::Completed => "completed",
            DataflowStatus::Failed => "failed",
            DataflowStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One entry in a dataflow execution's durable event log
/// (`spec.md` §3: ExecutionEvent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    /// Strictly increasing within one execution.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: ExecutionEventKind,
}

/// The tagged payload of an [`ExecutionEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEventKind {
    ExecutionStarted,
    TaskReady {
        task: String,
    },
    TaskStarted {
        task: String,
    },
    TaskCompleted {
        task: String,
        cached: bool,
        output_hash: String,
        duration_ms: u64,
    },
    TaskFailed {
        task: String,
        error: Option<String>,
        exit_code: Option<i32>,
        duration_ms: u64,
    },
    TaskSkipped {
        task: String,
        cause: String,
    },
    ExecutionCompleted {
        success: bool,
        executed: u64,
        cached: u64,
        failed: u64,
        skipped: u64,
        duration_ms: u64,
    },
    ExecutionCancelled {
        reason: Option<String>,
    },
}

impl ExecutionEventKind {
    /// The task this event concerns, if any — used by the scheduler to
    /// route state-machine transitions without re-matching the enum.
    pub fn task_name(&self) -> Option<&str> {
        match self {
            ExecutionEventKind::TaskReady { task }
            | ExecutionEventKind::TaskStarted { task }
            | ExecutionEventKind::TaskCompleted { task, .. }
            | ExecutionEventKind::TaskFailed { task, .. }
            | ExecutionEventKind::TaskSkipped { task, .. } => Some(task),
            ExecutionEventKind::ExecutionStarted
            | ExecutionEventKind::ExecutionCompleted { .. }
            | ExecutionEventKind::ExecutionCancelled { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
