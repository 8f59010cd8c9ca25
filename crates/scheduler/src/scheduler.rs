// SPDX-License-Identifier: MIT

//! The resumable dataflow scheduler (`spec.md` §4.J) — the hardest part
//! of this engine. Single logical thread, cooperative: the dispatch loop
//! never runs two steps concurrently with itself, but task runners race
//! each other in parallel, joined back in with a `tokio::task::JoinSet`
//! the way the teacher's `event_bus`-driven engines fold worker
//! completions back into one sequential loop.

use crate::error::SchedulerError;
use crate::execution_record::{inputs_hash, ExecutionRecord, ExecutionRecordStore, ProcessLiveness};
use crate::planner::{self, DataflowGraph, PlannedTask};
use crate::state::{DataflowState, TaskState};
use crate::state_store::DataflowStateStore;
use chrono::Utc;
use e3_core::{Clock, DataRef, DataflowStatus, ExecutionEvent, ExecutionEventKind, ExecutionId, Hash, TaskStatus};
use e3_package::PackageStore;
use e3_runner::{CancelSignal, TaskOptions, TaskResult, TaskRunner};
use e3_store::{tree, ObjectStore};
use e3_workspace::WorkspaceStore;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, info_span, Instrument};

type Completion = (String, TaskResult, chrono::DateTime<Utc>, Duration, Vec<Hash>);

/// Caller-supplied options for `dataflow.start` (`spec.md` §6.5).
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub concurrency: usize,
    pub force: bool,
    /// Narrows the run to an existing subset of task names (`spec.md`
    /// §4.I). Any task not named here is marked `skipped` up front
    /// (`not_selected_by_filter`) instead of being dispatched.
    pub filter: Option<Vec<String>>,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            force: false,
            filter: None,
        }
    }
}

/// Canonical sentinel for the inline `null` `DataRef`: it carries no
/// blob, but the scheduler still needs a stable per-input hash to fold
/// into `inputsHash`.
fn null_sentinel_hash() -> Hash {
    Hash::of_bytes(b"e3:null")
}

/// Drives one dataflow execution end to end: planning, dispatch,
/// caching, skip propagation, and durable persistence.
pub struct Scheduler {
    objects: ObjectStore,
    packages: PackageStore,
    records: ExecutionRecordStore,
    runner: Arc<dyn TaskRunner>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(
        objects: ObjectStore,
        packages: PackageStore,
        records: ExecutionRecordStore,
        runner: Arc<dyn TaskRunner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            objects,
            packages,
            records,
            runner,
            clock,
        }
    }

    /// Plan the workspace's graph and either build a fresh
    /// [`DataflowState`] or resume a persisted one whose `graphHash`
    /// still matches (`spec.md` §4.J "Resume"). Persists
    /// `execution_started` (for a fresh run) before returning, so the
    /// caller can hand back an execution handle with no further
    /// suspension observable.
    pub fn initialize(
        &self,
        state_store: &dyn DataflowStateStore,
        workspace_store: &WorkspaceStore,
        repo_label: &str,
        workspace: &str,
        id: ExecutionId,
        opts: StartOptions,
    ) -> Result<(DataflowState, DataflowGraph), SchedulerError> {
        let ws_state = workspace_store.get_state(workspace)?;
        let graph = planner::plan(&self.objects, &self.packages, &ws_state)?;

        if let Some(persisted) = state_store.load(workspace)? {
            if persisted.status == DataflowStatus::Running {
                if persisted.graph_hash != graph.graph_hash {
                    return Err(SchedulerError::GraphDrift {
                        persisted: persisted.graph_hash.to_string(),
                        fresh: graph.graph_hash.to_string(),
                    });
                }
                info!(workspace, execution = %persisted.id, "resuming persisted dataflow execution");
                return Ok((persisted, graph));
            }
        }

        let mut tasks = indexmap::IndexMap::with_capacity(graph.tasks.len());
        for planned in graph.tasks.values() {
            tasks.insert(planned.name.clone(), TaskState::pending(planned.depends_on.clone()));
        }

        let mut state = DataflowState {
            id,
            repo: repo_label.to_string(),
            workspace: workspace.to_string(),
            started_at: self.clock.now_utc(),
            concurrency: opts.concurrency.max(1),
            force: opts.force,
            filter: opts.filter.clone(),
            graph_hash: graph.graph_hash.clone(),
            tasks,
            executed: 0,
            cached: 0,
            failed: 0,
            skipped: 0,
            status: DataflowStatus::Running,
            completed_at: None,
            error: None,
            events: Vec::new(),
            event_seq: 0,
        };

        self.emit(state_store, &mut state, ExecutionEventKind::ExecutionStarted)?;

        if let Some(allowed) = &opts.filter {
            let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
            let excluded: Vec<String> = state
                .tasks
                .keys()
                .filter(|name| !allowed.contains(name.as_str()))
                .cloned()
                .collect();
            for name in excluded {
                self.mark_skipped(state_store, &mut state, &name, "not_selected_by_filter")?;
            }
        }

        self.refresh_readiness(state_store, workspace_store, &graph, &mut state)?;
        Ok((state, graph))
    }

    /// Run the dispatch loop to completion or cancellation (`spec.md`
    /// §4.J steps 2-4).
    pub async fn drive(
        &self,
        state_store: &dyn DataflowStateStore,
        workspace_store: &WorkspaceStore,
        graph: &DataflowGraph,
        mut state: DataflowState,
        cancel: CancelSignal,
    ) -> Result<DataflowState, SchedulerError> {
        let semaphore = Arc::new(Semaphore::new(state.concurrency));
        let mut in_flight: JoinSet<Completion> = JoinSet::new();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            // Dispatch every currently-ready task, up to the semaphore's
            // available permits: repeat "take the first ready task in
            // insertion order" until slots or the ready set run out.
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let Ok(permit) = semaphore.clone().try_acquire_owned() else {
                    break;
                };
                let Some(name) = state.task_names_with_status(TaskStatus::Ready).into_iter().next() else {
                    drop(permit);
                    break;
                };
                self.dispatch_one(state_store, workspace_store, graph, &mut state, &name, &mut in_flight, &cancel, permit)?;
            }

            if in_flight.is_empty() && state.task_names_with_status(TaskStatus::Ready).is_empty() {
                break;
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let (name, result, started_at, duration, input_hashes) = joined.map_err(|e| SchedulerError::StatePersistence(e.to_string()))?;
            self.complete_one(state_store, workspace_store, graph, &mut state, &name, result, started_at, duration, input_hashes)?;
        }

        if cancel.is_cancelled() {
            // Drain whatever was already in flight so tasks that had
            // already completed remain completed (`spec.md` §5).
            while let Some(joined) = in_flight.join_next().await {
                if let Ok((name, result, started_at, duration, input_hashes)) = joined {
                    self.complete_one(state_store, workspace_store, graph, &mut state, &name, result, started_at, duration, input_hashes)?;
                }
            }
            state.status = DataflowStatus::Cancelled;
            state.completed_at = Some(self.clock.now_utc());
            self.emit(state_store, &mut state, ExecutionEventKind::ExecutionCancelled { reason: None })?;
            return Ok(state);
        }

        self.finalize(state_store, &mut state)?;
        Ok(state)
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch_one(
        &self,
        state_store: &dyn DataflowStateStore,
        workspace_store: &WorkspaceStore,
        graph: &DataflowGraph,
        state: &mut DataflowState,
        name: &str,
        in_flight: &mut JoinSet<Completion>,
        cancel: &CancelSignal,
        permit: OwnedSemaphorePermit,
    ) -> Result<(), SchedulerError> {
        // `name` always comes from this same `graph`'s own ready set.
        #[allow(clippy::expect_used)]
        let planned = graph.tasks.get(name).expect("ready task must be in the planned graph").clone();
        let ws_state = workspace_store.get_state(&state.workspace)?;

        let mut input_hashes = Vec::with_capacity(planned.inputs.len());
        for path in &planned.inputs {
            let r#ref = tree::walk(&self.objects, &ws_state.root_hash, path)?;
            input_hashes.push(match r#ref {
                DataRef::Value { hash } | DataRef::Tree { hash } => hash,
                DataRef::Null => null_sentinel_hash(),
                DataRef::Unassigned => unreachable!("readiness rule excludes unassigned inputs"),
            });
        }
        let inputs_digest = inputs_hash(&input_hashes);

        if let Some(t) = state.tasks.get_mut(name) {
            t.inputs_hash = Some(inputs_digest.clone());
        }

        if !state.force {
            if let Some(output_hash) = self.records.cached_success(&planned.task_hash, &inputs_digest)? {
                drop(permit);
                self.emit(state_store, state, ExecutionEventKind::TaskStarted { task: name.to_string() })?;
                self.assign_output(workspace_store, state, &planned, output_hash.clone())?;
                let now = self.clock.now_utc();
                if let Some(t) = state.tasks.get_mut(name) {
                    t.status = TaskStatus::Completed;
                    t.output_hash = Some(output_hash.clone());
                    t.started_at = Some(now);
                    t.finished_at = Some(now);
                }
                state.cached += 1;
                self.emit(
                    state_store,
                    state,
                    ExecutionEventKind::TaskCompleted {
                        task: name.to_string(),
                        cached: true,
                        output_hash: output_hash.to_string(),
                        duration_ms: 0,
                    },
                )?;
                self.refresh_readiness(state_store, workspace_store, graph, state)?;
                return Ok(());
            }
        }

        let execution_id = state.id.to_string();
        let started_at = self.clock.now_utc();
        self.records.write(
            &planned.task_hash,
            &inputs_digest,
            &ExecutionRecord::Running {
                execution_id,
                input_hashes: input_hashes.clone(),
                started_at,
                liveness: ProcessLiveness::current(),
            },
        )?;

        if let Some(t) = state.tasks.get_mut(name) {
            t.status = TaskStatus::InProgress;
            t.started_at = Some(started_at);
        }
        self.emit(state_store, state, ExecutionEventKind::TaskStarted { task: name.to_string() })?;

        let runner = self.runner.clone();
        let task_hash = planned.task_hash.clone();
        let task_name = name.to_string();
        let options = TaskOptions {
            cancel: Some(cancel.clone()),
            ..TaskOptions::default()
        };
        let clock = self.clock.clone();
        let span = info_span!("task_dispatch", task = %task_name);
        in_flight.spawn(
            async move {
                let t0 = clock.monotonic_now();
                let result = runner.execute(&task_hash, &input_hashes, &options).await;
                let duration = clock.monotonic_now().saturating_duration_since(t0);
                drop(permit);
                (task_name, result, started_at, duration, input_hashes)
            }
            .instrument(span),
        );
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn complete_one(
        &self,
        state_store: &dyn DataflowStateStore,
        workspace_store: &WorkspaceStore,
        graph: &DataflowGraph,
        state: &mut DataflowState,
        name: &str,
        result: TaskResult,
        started_at: chrono::DateTime<Utc>,
        duration: Duration,
        input_hashes: Vec<Hash>,
    ) -> Result<(), SchedulerError> {
        // `name` always comes from a completion this same `graph` dispatched.
        #[allow(clippy::expect_used)]
        let planned = graph.tasks.get(name).expect("completed task must be in the planned graph").clone();
        // `dispatch_one` always records `inputsHash` before spawning.
        #[allow(clippy::expect_used)]
        let inputs_digest = state
            .tasks
            .get(name)
            .and_then(|t| t.inputs_hash.clone())
            .expect("dispatched task always records its inputsHash first");
        let duration_ms = duration.as_millis() as u64;
        let completed_at = self.clock.now_utc();

        match result {
            TaskResult::Success { output_hash } => {
                self.records.write(
                    &planned.task_hash,
                    &inputs_digest,
                    &ExecutionRecord::Success {
                        execution_id: state.id.to_string(),
                        input_hashes: input_hashes.clone(),
                        started_at,
                        completed_at,
                        output_hash: output_hash.clone(),
                    },
                )?;
                self.assign_output(workspace_store, state, &planned, output_hash.clone())?;
                if let Some(t) = state.tasks.get_mut(name) {
                    t.status = TaskStatus::Completed;
                    t.output_hash = Some(output_hash.clone());
                    t.finished_at = Some(completed_at);
                }
                state.executed += 1;
                self.emit(
                    state_store,
                    state,
                    ExecutionEventKind::TaskCompleted {
                        task: name.to_string(),
                        cached: false,
                        output_hash: output_hash.to_string(),
                        duration_ms,
                    },
                )?;
                self.refresh_readiness(state_store, workspace_store, graph, state)?;
            }
            TaskResult::Failed { exit_code } => {
                self.records.write(
                    &planned.task_hash,
                    &inputs_digest,
                    &ExecutionRecord::Failed {
                        execution_id: state.id.to_string(),
                        input_hashes: input_hashes.clone(),
                        started_at,
                        completed_at,
                        exit_code,
                    },
                )?;
                if let Some(t) = state.tasks.get_mut(name) {
                    t.status = TaskStatus::Failed;
                    t.exit_code = Some(exit_code);
                    t.finished_at = Some(completed_at);
                }
                state.failed += 1;
                self.emit(
                    state_store,
                    state,
                    ExecutionEventKind::TaskFailed {
                        task: name.to_string(),
                        error: None,
                        exit_code: Some(exit_code),
                        duration_ms,
                    },
                )?;
                self.propagate_skip(state_store, graph, state, name)?;
            }
            TaskResult::Error { message } => {
                self.records.write(
                    &planned.task_hash,
                    &inputs_digest,
                    &ExecutionRecord::Error {
                        execution_id: state.id.to_string(),
                        input_hashes: input_hashes.clone(),
                        started_at,
                        completed_at,
                        message: message.clone(),
                    },
                )?;
                if let Some(t) = state.tasks.get_mut(name) {
                    t.status = TaskStatus::Failed;
                    t.error = Some(message.clone());
                    t.finished_at = Some(completed_at);
                }
                state.failed += 1;
                self.emit(
                    state_store,
                    state,
                    ExecutionEventKind::TaskFailed {
                        task: name.to_string(),
                        error: Some(message),
                        exit_code: None,
                        duration_ms,
                    },
                )?;
                self.propagate_skip(state_store, graph, state, name)?;
            }
        }
        Ok(())
    }

    fn assign_output(
        &self,
        workspace_store: &WorkspaceStore,
        state: &DataflowState,
        planned: &PlannedTask,
        output_hash: Hash,
    ) -> Result<(), SchedulerError> {
        let ws_state = workspace_store.get_state(&state.workspace)?;
        let new_root = tree::update(&self.objects, &ws_state.root_hash, &planned.output, DataRef::value(output_hash))?;
        workspace_store.set_root(&state.workspace, new_root)?;
        Ok(())
    }

    /// A pending task becomes ready when every dependency is `completed`
    /// and every input path resolves (against the workspace's *current*
    /// root) to a ref that isn't `unassigned` (`spec.md` §4.J "Readiness
    /// rule"; a tree-typed input counts as ready without recursing into
    /// its leaves, per the documented Open Question resolution).
    fn refresh_readiness(
        &self,
        state_store: &dyn DataflowStateStore,
        workspace_store: &WorkspaceStore,
        graph: &DataflowGraph,
        state: &mut DataflowState,
    ) -> Result<(), SchedulerError> {
        let ws_state = workspace_store.get_state(&state.workspace)?;
        let mut newly_ready = Vec::new();
        for (name, planned) in &graph.tasks {
            let is_pending = matches!(state.tasks.get(name).map(|t| t.status), Some(TaskStatus::Pending));
            if !is_pending {
                continue;
            }
            let deps_done = planned
                .depends_on
                .iter()
                .all(|dep| matches!(state.tasks.get(dep).map(|t| t.status), Some(TaskStatus::Completed)));
            if !deps_done {
                continue;
            }
            let mut inputs_ready = true;
            for path in &planned.inputs {
                let r#ref = tree::walk(&self.objects, &ws_state.root_hash, path)?;
                if r#ref.is_unassigned() {
                    inputs_ready = false;
                    break;
                }
            }
            if inputs_ready {
                newly_ready.push(name.clone());
            }
        }
        for name in newly_ready {
            if let Some(t) = state.tasks.get_mut(&name) {
                t.status = TaskStatus::Ready;
            }
            self.emit(state_store, state, ExecutionEventKind::TaskReady { task: name })?;
        }
        Ok(())
    }

    /// BFS over the reverse dependency edges from `failed_task`, marking
    /// every still-pending/ready dependent `skipped` (`spec.md` §4.J
    /// "Failure propagation").
    fn propagate_skip(
        &self,
        state_store: &dyn DataflowStateStore,
        graph: &DataflowGraph,
        state: &mut DataflowState,
        failed_task: &str,
    ) -> Result<(), SchedulerError> {
        let mut dependents_of: HashMap<&str, Vec<&str>> = HashMap::new();
        for planned in graph.tasks.values() {
            for dep in &planned.depends_on {
                dependents_of.entry(dep.as_str()).or_default().push(planned.name.as_str());
            }
        }
        let mut queue = vec![failed_task.to_string()];
        while let Some(finished) = queue.pop() {
            let Some(downstream) = dependents_of.get(finished.as_str()).cloned() else {
                continue;
            };
            for dep_name in downstream {
                let should_skip = matches!(
                    state.tasks.get(dep_name).map(|t| t.status),
                    Some(TaskStatus::Pending) | Some(TaskStatus::Ready)
                );
                if should_skip {
                    self.mark_skipped(state_store, state, dep_name, &format!("upstream_failed:{finished}"))?;
                    queue.push(dep_name.to_string());
                }
            }
        }
        Ok(())
    }

    fn mark_skipped(
        &self,
        state_store: &dyn DataflowStateStore,
        state: &mut DataflowState,
        name: &str,
        cause: &str,
    ) -> Result<(), SchedulerError> {
        let already_terminal = state.tasks.get(name).map(|t| t.status.is_terminal()).unwrap_or(true);
        if already_terminal {
            return Ok(());
        }
        if let Some(t) = state.tasks.get_mut(name) {
            t.status = TaskStatus::Skipped;
            t.finished_at = Some(self.clock.now_utc());
        }
        state.skipped += 1;
        self.emit(
            state_store,
            state,
            ExecutionEventKind::TaskSkipped {
                task: name.to_string(),
                cause: cause.to_string(),
            },
        )
    }

    /// `spec.md` §8 property 5 "mass conservation": any task left
    /// non-terminal once the dispatch loop finds no more ready work has
    /// no path to readiness and is skipped.
    fn finalize(&self, state_store: &dyn DataflowStateStore, state: &mut DataflowState) -> Result<(), SchedulerError> {
        let stuck: Vec<String> = state
            .tasks
            .iter()
            .filter(|(_, t)| !t.status.is_terminal())
            .map(|(name, _)| name.clone())
            .collect();
        for name in stuck {
            self.mark_skipped(state_store, state, &name, "unavailable_input")?;
        }

        let success = state.failed == 0;
        state.status = if success { DataflowStatus::Completed } else { DataflowStatus::Failed };
        state.completed_at = Some(self.clock.now_utc());
        // Just set on the line above.
        #[allow(clippy::expect_used)]
        let duration_ms = (state.completed_at.expect("set above") - state.started_at).num_milliseconds().max(0) as u64;
        self.emit(
            state_store,
            state,
            ExecutionEventKind::ExecutionCompleted {
                success,
                executed: state.executed,
                cached: state.cached,
                failed: state.failed,
                skipped: state.skipped,
                duration_ms,
            },
        )?;
        info!(
            workspace = %state.workspace,
            status = %state.status,
            executed = state.executed,
            cached = state.cached,
            failed = state.failed,
            skipped = state.skipped,
            "dataflow execution finished"
        );
        Ok(())
    }

    /// Append to the durable event log, bump `event_seq`, then persist
    /// the full snapshot — write-event-then-persist, so a crash mid-write
    /// still leaves the event log as the source of truth.
    fn emit(&self, state_store: &dyn DataflowStateStore, state: &mut DataflowState, kind: ExecutionEventKind) -> Result<(), SchedulerError> {
        state.event_seq += 1;
        let event = ExecutionEvent {
            seq: state.event_seq,
            timestamp: self.clock.now_utc(),
            kind,
        };
        let mut log = state_store.open_event_log(&state.workspace)?;
        log.append(&event)?;
        state.events.push(event);
        state_store.persist(state)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
