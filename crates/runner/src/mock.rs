// SPDX-License-Identifier: MIT

//! Test-double `TaskRunner` with a recorded call log and programmable
//! per-task responses (`spec.md` §4.H "A `MockTaskRunner` satisfies the same
//! contract and records all calls for deterministic scheduler tests").

use crate::model::{TaskOptions, TaskResult};
use crate::runner::TaskRunner;
use async_trait::async_trait;
use e3_core::Hash;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCall {
    pub task_hash: Hash,
    pub input_hashes: Vec<Hash>,
}

struct MockState {
    calls: Vec<RunnerCall>,
    responses: HashMap<Hash, TaskResult>,
    default: TaskResult,
}

/// Records every `execute` call and answers from a per-`taskHash` table,
/// falling back to a configurable default (`Success` with a fixed output
/// hash unless overridden).
#[derive(Clone)]
pub struct MockTaskRunner {
    inner: Arc<Mutex<MockState>>,
}

impl Default for MockTaskRunner {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                calls: Vec::new(),
                responses: HashMap::new(),
                default: TaskResult::Failed { exit_code: 1 },
            })),
        }
    }
}

impl MockTaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program the result returned for a specific `taskHash`.
    pub fn set_result(&self, task_hash: Hash, result: TaskResult) {
        self.inner.lock().responses.insert(task_hash, result);
    }

    /// Change what's returned for any `taskHash` with no programmed result.
    pub fn set_default(&self, result: TaskResult) {
        self.inner.lock().default = result;
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }
}

#[async_trait]
impl TaskRunner for MockTaskRunner {
    async fn execute(&self, task_hash: &Hash, input_hashes: &[Hash], options: &TaskOptions) -> TaskResult {
        if let Some(cancel) = &options.cancel {
            if cancel.is_cancelled() {
                return TaskResult::cancelled();
            }
        }

        let mut inner = self.inner.lock();
        inner.calls.push(RunnerCall {
            task_hash: task_hash.clone(),
            input_hashes: input_hashes.to_vec(),
        });
        inner.responses.get(task_hash).cloned().unwrap_or_else(|| inner.default.clone())
    }
}
