use super::*;
use crate::state::TaskState;
use e3_core::{DataflowStatus, ExecutionId, Hash, TaskStatus};
use tempfile::tempdir;

fn sample_state(workspace: &str) -> DataflowState {
    let mut tasks = indexmap::IndexMap::new();
    tasks.insert("a".to_string(), TaskState::pending(vec![]));
    DataflowState {
        id: ExecutionId::new("exec-1"),
        repo: "/repo".to_string(),
        workspace: workspace.to_string(),
        started_at: chrono::Utc::now(),
        concurrency: 1,
        force: false,
        filter: None,
        graph_hash: Hash::of_bytes(b"graph"),
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
fn file_store_round_trips_a_snapshot() {
    let dir = tempdir().expect("tempdir");
    let store = FileDataflowStateStore::new(dir.path());
    let state = sample_state("w1");

    assert!(store.load("w1").expect("load").is_none());
    store.persist(&state).expect("persist");
    let loaded = store.load("w1").expect("load").expect("present");
    assert_eq!(loaded.workspace, state.workspace);
    assert_eq!(loaded.graph_hash, state.graph_hash);
    assert_eq!(loaded.tasks.len(), 1);
}

#[test]
fn file_store_snapshots_for_distinct_workspaces_are_independent() {
    let dir = tempdir().expect("tempdir");
    let store = FileDataflowStateStore::new(dir.path());
    store.persist(&sample_state("w1")).expect("persist w1");
    store.persist(&sample_state("w2")).expect("persist w2");

    assert_eq!(store.load("w1").expect("load").unwrap().workspace, "w1");
    assert_eq!(store.load("w2").expect("load").unwrap().workspace, "w2");
}

#[test]
fn file_store_quarantines_a_corrupt_snapshot_instead_of_failing_silently() {
    let dir = tempdir().expect("tempdir");
    let store = FileDataflowStateStore::new(dir.path());
    let state = sample_state("w1");
    store.persist(&state).expect("persist");

    let snapshot_path = dir.path().join("w1").join("dataflow").join("snapshot.zst");
    std::fs::write(&snapshot_path, b"not a valid zstd frame").expect("corrupt");

    let err = store.load("w1").expect_err("corrupt snapshot should error");
    assert!(matches!(err, StateStoreError::Compression(_)));
    assert!(!snapshot_path.exists(), "corrupt snapshot should be rotated away");
}

#[test]
fn file_store_exposes_a_usable_event_log() {
    let dir = tempdir().expect("tempdir");
    let store = FileDataflowStateStore::new(dir.path());
    let mut log = store.open_event_log("w1").expect("open log");
    let event = e3_core::ExecutionEvent {
        seq: 1,
        timestamp: chrono::Utc::now(),
        kind: e3_core::ExecutionEventKind::ExecutionStarted,
    };
    log.append(&event).expect("append");
    assert_eq!(log.replay().expect("replay"), vec![event]);
}

#[test]
fn in_memory_store_round_trips_without_touching_disk_for_snapshots() {
    let store = InMemoryDataflowStateStore::new();
    let mut state = sample_state("w1");
    assert!(store.load("w1").expect("load").is_none());
    store.persist(&state).expect("persist");
    assert_eq!(store.load("w1").expect("load").unwrap().workspace, "w1");

    state.tasks.get_mut("a").unwrap().status = TaskStatus::Completed;
    store.persist(&state).expect("persist again");
    assert_eq!(
        store.load("w1").expect("load").unwrap().tasks["a"].status,
        TaskStatus::Completed
    );
}

#[test]
fn in_memory_store_with_logs_dir_still_persists_a_real_event_log() {
    let logs = tempdir().expect("tempdir");
    let store = InMemoryDataflowStateStore::with_logs_dir(logs.path());
    let mut log = store.open_event_log("w1").expect("open log");
    let event = e3_core::ExecutionEvent {
        seq: 1,
        timestamp: chrono::Utc::now(),
        kind: e3_core::ExecutionEventKind::ExecutionStarted,
    };
    log.append(&event).expect("append");
    assert!(logs.path().join("w1.events.jsonl").exists());
}
