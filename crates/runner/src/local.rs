// SPDX-License-Identifier: MIT

//! A demonstration process-based runner (`spec.md` §4.H: "a local process
//! runner (external)" — the per-language runtimes are explicitly out of
//! scope, but the core still needs a concrete `TaskRunner` to drive end to
//! end). Treats `TaskObject::commandIr` as a UTF-8 shell command, feeds the
//! resolved inputs to it as JSON on stdin, and decodes its stdout as one
//! `east`-text value. Grounded on `run_with_timeout`'s timeout-wrapped
//! `Command::output` shape.

use crate::error::RunnerError;
use crate::model::{TaskOptions, TaskResult};
use crate::runner::TaskRunner;
use async_trait::async_trait;
use e3_core::{codec, Hash};
use e3_package::PackageStore;
use e3_store::ObjectStore;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

/// No default per-task timeout in `spec.md` §5; this is this runner's own
/// termination window for honouring cancellation, not a spec requirement.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct LocalProcessRunner {
    objects: ObjectStore,
    packages: PackageStore,
}

impl LocalProcessRunner {
    pub fn new(objects: ObjectStore, packages: PackageStore) -> Self {
        Self { objects, packages }
    }

    /// Spawn the task's command, feed it the resolved inputs, and collect
    /// its exit status and stdout. Does not interpret the exit status — the
    /// task-level/engine-level distinction (`spec.md` §4.H `failed` vs
    /// `error`) is made by the caller.
    async fn spawn_and_capture(
        &self,
        task_hash: &Hash,
        input_hashes: &[Hash],
        options: &TaskOptions,
    ) -> Result<(ExitStatus, Vec<u8>), RunnerError> {
        let task = self.packages.load_task(task_hash).map_err(RunnerError::Package)?;
        let command = std::str::from_utf8(&task.command_ir).map_err(|_| RunnerError::MalformedCommandIr)?;

        let mut inputs = Vec::with_capacity(input_hashes.len());
        for hash in input_hashes {
            let bytes = self.objects.read(hash)?;
            inputs.push(codec::decode_value(&bytes)?);
        }
        let stdin_payload = serde_json::to_vec(&inputs).map_err(e3_core::CodecError::from)?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(dir) = &options.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &options.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&stdin_payload).await?;
        }

        if let Some(mut stderr_pipe) = child.stderr.take() {
            tokio::spawn(async move {
                let mut discard = Vec::new();
                let _ = tokio::io::AsyncReadExt::read_to_end(&mut stderr_pipe, &mut discard).await;
            });
        }

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Io(std::io::Error::other("child stdout pipe missing")))?;
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            tokio::io::AsyncReadExt::read_to_end(&mut stdout_pipe, &mut buf)
                .await
                .map(|_| buf)
        });

        let status = loop {
            if let Some(cancel) = &options.cancel {
                if cancel.is_cancelled() {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    stdout_task.abort();
                    return Err(RunnerError::Cancelled);
                }
            }
            match tokio::time::timeout(CANCEL_POLL_INTERVAL, child.wait()).await {
                Ok(result) => break result?,
                Err(_elapsed) => continue,
            }
        };

        let stdout = stdout_task
            .await
            .map_err(|_| RunnerError::Io(std::io::Error::other("stdout reader task panicked")))??;

        Ok((status, stdout))
    }

    /// Decode a successful process's stdout as one `east`-text value and
    /// write its binary form to the object store.
    fn store_output(&self, stdout: &[u8]) -> Result<Hash, RunnerError> {
        let text = String::from_utf8_lossy(stdout);
        let value = codec::parse_text_inferring(text.trim())?;
        let encoded = codec::encode_value(&value)?;
        Ok(self.objects.write(&encoded)?)
    }
}

#[async_trait]
impl TaskRunner for LocalProcessRunner {
    async fn execute(&self, task_hash: &Hash, input_hashes: &[Hash], options: &TaskOptions) -> TaskResult {
        if let Some(cancel) = &options.cancel {
            if cancel.is_cancelled() {
                return TaskResult::cancelled();
            }
        }

        let (status, stdout) = match self.spawn_and_capture(task_hash, input_hashes, options).await {
            Ok(pair) => pair,
            Err(RunnerError::Cancelled) => {
                warn!(task = %task_hash, "task cancelled");
                return TaskResult::cancelled();
            }
            Err(e) => {
                warn!(task = %task_hash, error = %e, "task runner failed before the process produced a result");
                return TaskResult::Error { message: e.to_string() };
            }
        };

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            info!(task = %task_hash, exit_code, "task exited non-zero");
            return TaskResult::Failed { exit_code };
        }

        match self.store_output(&stdout) {
            Ok(output_hash) => {
                info!(task = %task_hash, output = %output_hash, "task completed");
                TaskResult::Success { output_hash }
            }
            Err(e) => {
                warn!(task = %task_hash, error = %e, "task produced output this engine could not store");
                TaskResult::Error { message: e.to_string() }
            }
        }
    }
}
