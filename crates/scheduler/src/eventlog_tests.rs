use super::*;
use e3_core::ExecutionEventKind;
use std::io::Write as _;
use tempfile::tempdir;

fn event(seq: u64, kind: ExecutionEventKind) -> ExecutionEvent {
    ExecutionEvent { seq, timestamp: Utc::now(), kind }
}

#[test]
fn append_then_replay_round_trips_in_order() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    let mut log = EventLog::open(&path).expect("open");
    log.append(&event(0, ExecutionEventKind::ExecutionStarted)).expect("append 0");
    log.append(&event(1, ExecutionEventKind::TaskReady { task: "a".into() })).expect("append 1");
    log.append(&event(
        2,
        ExecutionEventKind::TaskCompleted {
            task: "a".into(),
            cached: false,
            output_hash: "deadbeef".into(),
            duration_ms: 12,
        },
    ))
    .expect("append 2");

    let replayed = log.replay().expect("replay");
    assert_eq!(replayed.len(), 3);
    assert_eq!(replayed[0].seq, 0);
    assert_eq!(replayed[2].seq, 2);
}

#[test]
fn reopening_an_existing_log_preserves_prior_entries() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    {
        let mut log = EventLog::open(&path).expect("open 1");
        log.append(&event(0, ExecutionEventKind::ExecutionStarted)).expect("append");
    }
    let log = EventLog::open(&path).expect("open 2");
    assert_eq!(log.replay().expect("replay").len(), 1);
}

#[test]
fn a_corrupt_trailing_line_is_rotated_to_bak_and_the_valid_prefix_survives() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    {
        let mut log = EventLog::open(&path).expect("open");
        log.append(&event(0, ExecutionEventKind::ExecutionStarted)).expect("append");
    }
    // Corrupt the tail by appending an unparsable line directly.
    {
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).expect("open raw");
        file.write_all(b"not valid json\n").expect("write garbage");
    }

    let log = EventLog::open(&path).expect("reopen after corruption");
    let replayed = log.replay().expect("replay");
    assert_eq!(replayed.len(), 1);
    assert!(rotate_bak_path(&path).exists() || path.with_extension("bak").exists());
}

#[test]
fn rotate_bak_path_avoids_colliding_with_an_existing_bak_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    std::fs::write(&path, b"").expect("write");
    std::fs::write(path.with_extension("bak"), b"").expect("write bak");
    let next = rotate_bak_path(&path);
    assert_eq!(next, path.with_extension("bak.2"));
}
