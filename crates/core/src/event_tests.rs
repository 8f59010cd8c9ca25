// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn task_status_terminal_set() {
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Skipped.is_terminal());
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Ready.is_terminal());
    assert!(!TaskStatus::InProgress.is_terminal());
}

#[test]
fn event_kind_task_name_extraction() {
    let k = ExecutionEventKind::TaskStarted {
        task: "say_hello".into(),
    };
    assert_eq!(k.task_name(), Some("say_hello"));

    let k = ExecutionEventKind::ExecutionStarted;
    assert_eq!(k.task_name(), None);
}

#[test]
fn event_serde_round_trip() {
    let ev = ExecutionEvent {
        seq: 1,
        timestamp: Utc::now(),
        kind: ExecutionEventKind::TaskCompleted {
            task: "a".into(),
            cached: false,
            output_hash: "deadbeef".into(),
            duration_ms: 42,
        },
    };
    let json = serde_json::to_string(&ev).unwrap();
    let back: ExecutionEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(ev, back);
}

#[test]
fn display_forms_are_snake_case() {
    assert_eq!(TaskStatus::InProgress.to_string(), "in_progress");
    assert_eq!(DataflowStatus::Cancelled.to_string(), "cancelled");
}
