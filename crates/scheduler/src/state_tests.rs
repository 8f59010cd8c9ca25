use super::*;
use e3_core::Hash;

fn graph_hash() -> Hash {
    Hash::of_bytes(b"graph")
}

fn fresh_state(tasks: IndexMap<String, TaskState>) -> DataflowState {
    DataflowState {
        id: ExecutionId::new("exec-1"),
        repo: "/repo".to_string(),
        workspace: "w1".to_string(),
        started_at: Utc::now(),
        concurrency: 2,
        force: false,
        filter: None,
        graph_hash: graph_hash(),
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
    }
}

#[test]
fn pending_task_state_has_no_results_yet() {
    let t = TaskState::pending(vec!["a".to_string()]);
    assert_eq!(t.status, TaskStatus::Pending);
    assert_eq!(t.deps, vec!["a".to_string()]);
    assert!(t.output_hash.is_none());
    assert!(t.started_at.is_none());
}

#[test]
fn is_settled_is_false_while_any_task_is_non_terminal() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), TaskState::pending(vec![]));
    let mut state = fresh_state(tasks);
    assert!(!state.is_settled());

    state.tasks.get_mut("a").unwrap().status = TaskStatus::Completed;
    assert!(state.is_settled());
}

#[test]
fn task_names_with_status_filters_correctly() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), TaskState::pending(vec![]));
    tasks.insert("b".to_string(), TaskState::pending(vec![]));
    let mut state = fresh_state(tasks);
    state.tasks.get_mut("a").unwrap().status = TaskStatus::Completed;

    assert_eq!(state.task_names_with_status(TaskStatus::Completed), vec!["a".to_string()]);
    assert_eq!(state.task_names_with_status(TaskStatus::Pending), vec!["b".to_string()]);
}

#[test]
fn summary_buckets_pending_and_ready_together() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), TaskState::pending(vec![]));
    tasks.insert("b".to_string(), TaskState::pending(vec![]));
    let mut state = fresh_state(tasks);
    state.tasks.get_mut("a").unwrap().status = TaskStatus::Ready;

    let summary = state.summary();
    let mut pending = summary.pending.clone();
    pending.sort();
    assert_eq!(pending, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn wait_outcome_reports_failure_when_any_task_failed() {
    let mut tasks = IndexMap::new();
    tasks.insert("a".to_string(), TaskState::pending(vec![]));
    let mut state = fresh_state(tasks);
    state.status = DataflowStatus::Failed;
    state.failed = 1;
    state.completed_at = Some(state.started_at + chrono::Duration::milliseconds(250));

    let outcome = WaitOutcome::from(&state);
    assert!(!outcome.success);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.duration_ms, 250);
}

#[test]
fn wait_outcome_reports_success_when_completed_with_no_failures() {
    let state = fresh_state(IndexMap::new());
    let mut state = state;
    state.status = DataflowStatus::Completed;
    state.executed = 3;
    state.completed_at = Some(state.started_at);

    let outcome = WaitOutcome::from(&state);
    assert!(outcome.success);
    assert_eq!(outcome.executed, 3);
}
