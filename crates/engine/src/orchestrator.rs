// SPDX-License-Identifier: MIT

//! The orchestrator facade (`spec.md` §4.K, §6.5): owns the per-repository
//! running-execution map and drives `start/wait/status/cancel/getEvents`
//! over [`e3_scheduler::Scheduler`]. Grounded on the teacher's
//! `oj_daemon::lifecycle::DaemonState` — generalized from "one daemon, one
//! state" to "one `Engine`, many workspaces, one scheduler per workspace
//! with a currently running execution."

use crate::discovery;
use crate::error::EngineError;
use crate::repo::Repo;
use e3_core::{Clock, ExecutionEvent, ExecutionId, IdGen, SystemClock, UuidIdGen};
use e3_package::PackageInfo;
use e3_runner::{CancelSignal, LocalProcessRunner, TaskRunner};
use e3_scheduler::{DataflowStateStore, ExecutionRecord, Scheduler, StartOptions, StatusSummary, WaitOutcome};
use e3_store::{GcOptions, GcReport};
use e3_workspace::{current_holder, LockOperation, WorkspaceState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A handle to one in-flight or completed dataflow execution (`spec.md`
/// §6.5 `start`'s return value).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExecutionHandle {
    pub id: ExecutionId,
    pub repo: String,
    pub workspace: String,
}

struct RunningExecution {
    cancel: CancelSignal,
    join: JoinHandle<Result<e3_scheduler::DataflowState, e3_scheduler::SchedulerError>>,
}

/// One open repository plus the orchestrator over it.
pub struct Engine {
    repo: Repo,
    runner: Arc<dyn TaskRunner>,
    clock: Arc<dyn Clock>,
    id_gen: Arc<dyn IdGen>,
    running: Mutex<HashMap<String, RunningExecution>>,
}

impl Engine {
    /// Build an engine from an already-open repo and an explicit runner
    /// — the shape tests use to swap in `MockTaskRunner`.
    pub fn new(repo: Repo, runner: Arc<dyn TaskRunner>, clock: Arc<dyn Clock>, id_gen: Arc<dyn IdGen>) -> Self {
        Self {
            repo,
            runner,
            clock,
            id_gen,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Production engine: `LocalProcessRunner`, system clock, UUIDv7 ids.
    fn production(repo: Repo) -> Self {
        let runner = Arc::new(LocalProcessRunner::new(repo.objects().clone(), repo.packages().clone()));
        Self::new(repo, runner, Arc::new(SystemClock), Arc::new(UuidIdGen))
    }

    /// Open an already-initialized repository at an explicit path.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Ok(Self::production(Repo::open(path.as_ref())?))
    }

    /// Initialize a fresh repository at an explicit path.
    pub fn init_at(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Ok(Self::production(Repo::init(path.as_ref())?))
    }

    /// Resolve a repository per the `spec.md` §6.4 lookup order and open
    /// (or, for the `~/.e3` fallback, initialize) it.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, EngineError> {
        Ok(Self::production(discovery::discover_and_open(explicit)?))
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Reconstruct an [`ExecutionHandle`] for a workspace that already
    /// has persisted execution state — the shape a CLI invocation needs
    /// when `status`/`wait`/`cancel`/`events` run as a separate process
    /// from the one that called `start`.
    pub fn handle_for(&self, workspace: &str) -> Result<ExecutionHandle, EngineError> {
        let state = self
            .repo
            .state_store()
            .load(workspace)?
            .ok_or_else(|| EngineError::NotRunning(workspace.to_string()))?;
        Ok(ExecutionHandle {
            id: state.id,
            repo: self.repo.label(),
            workspace: workspace.to_string(),
        })
    }

    // -- package/workspace passthroughs, the rest of what a CLI needs --

    pub fn import_package(&self, zip_bytes: &[u8], force: bool) -> Result<PackageInfo, EngineError> {
        Ok(self.repo.packages().import(zip_bytes, force)?)
    }

    pub fn list_packages(&self) -> Result<Vec<PackageInfo>, EngineError> {
        Ok(self.repo.packages().list()?)
    }

    pub fn create_workspace(&self, name: &str) -> Result<(), EngineError> {
        Ok(self.repo.workspaces().create(name)?)
    }

    pub fn deploy_workspace(&self, name: &str, pkg_ref: &str) -> Result<WorkspaceState, EngineError> {
        Ok(self.repo.workspaces().deploy(name, pkg_ref, self.repo.packages())?)
    }

    pub fn workspace_state(&self, name: &str) -> Result<WorkspaceState, EngineError> {
        Ok(self.repo.workspaces().get_state(name)?)
    }

    pub fn list_workspaces(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.repo.workspaces().list()?)
    }

    pub fn remove_workspace(&self, name: &str) -> Result<(), EngineError> {
        Ok(self.repo.workspaces().remove(name)?)
    }

    pub fn export_workspace(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        Ok(self.repo.workspaces().export(name)?)
    }

    /// `spec.md` §4.L: live roots are every workspace's current root,
    /// every imported package's full closure, and (unless this sweep is
    /// told not to bother) every in-flight or retained execution's
    /// inputs/output.
    pub fn gc(&self, opts: &GcOptions) -> Result<GcReport, EngineError> {
        let mut roots = Vec::new();
        for name in self.repo.workspaces().list()? {
            if let Ok(state) = self.repo.workspaces().get_state(&name) {
                roots.push(state.root_hash);
            }
        }
        for info in self.repo.packages().list()? {
            let package = self.repo.packages().load(&info.hash)?;
            roots.push(info.hash);
            roots.push(package.datasets);
            roots.extend(package.tasks.into_values());
        }
        for (_, _, record) in self.repo.executions().iter_all()? {
            match record {
                ExecutionRecord::Running { input_hashes, .. } => roots.extend(input_hashes),
                ExecutionRecord::Success { output_hash, .. } if opts.retain_execution_outputs => {
                    roots.push(output_hash);
                }
                _ => {}
            }
        }
        let live = e3_store::gc::mark(self.repo.objects(), roots);
        Ok(e3_store::gc::sweep(self.repo.objects(), &live, opts)?)
    }

    // -- the orchestrator contract itself (`spec.md` §6.5) --

    /// `start`: acquires the workspace's `dataflow` lock, plans and
    /// persists `execution_started` synchronously, then drives the
    /// dispatch loop in the background. Returns as soon as
    /// `execution_started` is durable — no suspension beyond that is
    /// observable to the caller.
    pub async fn start(&self, workspace: &str, opts: StartOptions) -> Result<ExecutionHandle, EngineError> {
        let holder = current_holder(format!("e3 run {workspace}"));
        let lock = self.repo.workspaces().locks().acquire(workspace, LockOperation::Dataflow, holder)?;

        let scheduler = Scheduler::new(
            self.repo.objects().clone(),
            self.repo.packages().clone(),
            self.repo.executions().clone(),
            self.runner.clone(),
            self.clock.clone(),
        );
        let id = ExecutionId::new(self.id_gen.next());
        let repo_label = self.repo.label();
        let state_store = self.repo.state_store();
        let (state, graph) = scheduler.initialize(state_store.as_ref(), self.repo.workspaces(), &repo_label, workspace, id.clone(), opts)?;

        let handle = ExecutionHandle {
            id,
            repo: repo_label,
            workspace: workspace.to_string(),
        };

        let cancel = CancelSignal::new();
        let task_cancel = cancel.clone();
        let workspaces = self.repo.workspaces().clone();
        let state_store_for_task = state_store.clone();
        let workspace_key = workspace.to_string();

        let join = tokio::spawn(async move {
            let result = scheduler.drive(state_store_for_task.as_ref(), &workspaces, &graph, state, task_cancel).await;
            drop(lock);
            result
        });

        self.running.lock().insert(workspace_key, RunningExecution { cancel, join });
        Ok(handle)
    }

    /// `wait`: awaits this process's own in-flight execution if one is
    /// tracked for the handle's workspace, otherwise falls back to
    /// whatever is already durably persisted (a prior `wait` already
    /// consumed the in-flight handle, or the execution settled before
    /// `wait` was called at all).
    pub async fn wait(&self, handle: &ExecutionHandle) -> Result<WaitOutcome, EngineError> {
        let running = self.running.lock().remove(&handle.workspace);
        if let Some(running) = running {
            let state = running
                .join
                .await
                .map_err(|e| EngineError::Join {
                    workspace: handle.workspace.clone(),
                    detail: e.to_string(),
                })??;
            return Ok(WaitOutcome::from(&state));
        }
        let state = self
            .repo
            .state_store()
            .load(&handle.workspace)?
            .ok_or_else(|| EngineError::NotRunning(handle.workspace.clone()))?;
        Ok(WaitOutcome::from(&state))
    }

    /// `getStatus`: a compact summary derived from the persisted state.
    pub fn status(&self, handle: &ExecutionHandle) -> Result<StatusSummary, EngineError> {
        let state = self
            .repo
            .state_store()
            .load(&handle.workspace)?
            .ok_or_else(|| EngineError::NotRunning(handle.workspace.clone()))?;
        Ok(state.summary())
    }

    /// `cancel`: signals the running scheduler cooperatively; does not
    /// itself wait for the run to settle.
    pub fn cancel(&self, handle: &ExecutionHandle) -> Result<(), EngineError> {
        let running = self.running.lock();
        match running.get(&handle.workspace) {
            Some(running) => {
                running.cancel.cancel();
                Ok(())
            }
            None => Err(EngineError::NotRunning(handle.workspace.clone())),
        }
    }

    /// `getEvents`: persisted events with `seq > sinceSeq`, in order —
    /// the primitive an HTTP API would poll.
    pub fn get_events(&self, handle: &ExecutionHandle, since_seq: u64) -> Result<Vec<ExecutionEvent>, EngineError> {
        let state = self
            .repo
            .state_store()
            .load(&handle.workspace)?
            .ok_or_else(|| EngineError::NotRunning(handle.workspace.clone()))?;
        Ok(state.events.into_iter().filter(|e| e.seq > since_seq).collect())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
