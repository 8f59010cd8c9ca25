// SPDX-License-Identifier: MIT

use crate::model::{TaskOptions, TaskResult};
use async_trait::async_trait;
use e3_core::Hash;

/// The pluggable contract the scheduler drives (`spec.md` §4.H). A real
/// implementation lives per task language, entirely out of scope here; this
/// crate ships the contract plus a [`crate::mock::MockTaskRunner`] test
/// double and a demonstration [`crate::local::LocalProcessRunner`].
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn execute(&self, task_hash: &Hash, input_hashes: &[Hash], options: &TaskOptions) -> TaskResult;
}
