// SPDX-License-Identifier: MIT

use e3_core::Hash;
use std::path::PathBuf;

/// Options the scheduler passes to a task invocation (`spec.md` §4.H).
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    pub cancel: Option<crate::cancel::CancelSignal>,
}

/// The runner's outcome for one invocation (`spec.md` §4.H). Not wrapped in
/// `Result`: a runner-level error is itself a variant, since the scheduler
/// treats `Failed` and `Error` identically for skip propagation but needs to
/// tell them apart in the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Success { output_hash: Hash },
    Failed { exit_code: i32 },
    Error { message: String },
}

impl TaskResult {
    pub fn cancelled() -> Self {
        TaskResult::Error {
            message: "cancelled".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }
}
