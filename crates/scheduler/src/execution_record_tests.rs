use super::*;
use tempfile::tempdir;

fn hash(bytes: &[u8]) -> Hash {
    Hash::of_bytes(bytes)
}

#[test]
fn inputs_hash_is_order_independent() {
    let a = hash(b"a");
    let b = hash(b"b");
    assert_eq!(inputs_hash(&[a.clone(), b.clone()]), inputs_hash(&[b, a]));
}

#[test]
fn read_missing_record_is_none() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    let task = hash(b"task");
    let inputs = inputs_hash(&[hash(b"in")]);
    assert!(store.read(&task, &inputs).expect("read").is_none());
}

#[test]
fn write_then_read_round_trips() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    let task = hash(b"task");
    let inputs = inputs_hash(&[hash(b"in")]);
    let record = ExecutionRecord::Success {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in")],
        started_at: Utc::now(),
        completed_at: Utc::now(),
        output_hash: hash(b"out"),
    };
    store.write(&task, &inputs, &record).expect("write");
    let read = store.read(&task, &inputs).expect("read").expect("present");
    assert_eq!(read, record);
}

#[test]
fn cached_success_returns_output_hash_only_for_success() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    let task = hash(b"task");
    let inputs = inputs_hash(&[hash(b"in")]);

    assert_eq!(store.cached_success(&task, &inputs).expect("cache"), None);

    let running = ExecutionRecord::Running {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in")],
        started_at: Utc::now(),
        liveness: ProcessLiveness::current(),
    };
    store.write(&task, &inputs, &running).expect("write");
    assert_eq!(store.cached_success(&task, &inputs).expect("cache"), None);

    let success = ExecutionRecord::Success {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in")],
        started_at: Utc::now(),
        completed_at: Utc::now(),
        output_hash: hash(b"out"),
    };
    store.write(&task, &inputs, &success).expect("write");
    assert_eq!(store.cached_success(&task, &inputs).expect("cache"), Some(hash(b"out")));
}

#[test]
fn a_failed_record_has_no_cached_output() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    let task = hash(b"task");
    let inputs = inputs_hash(&[hash(b"in")]);
    let failed = ExecutionRecord::Failed {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in")],
        started_at: Utc::now(),
        completed_at: Utc::now(),
        exit_code: 1,
    };
    store.write(&task, &inputs, &failed).expect("write");
    assert_eq!(store.cached_success(&task, &inputs).expect("cache"), None);
}

#[test]
fn a_running_record_with_a_fabricated_dead_liveness_triple_is_stale() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    let task = hash(b"task");
    let inputs = inputs_hash(&[hash(b"in")]);
    let running = ExecutionRecord::Running {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in")],
        started_at: Utc::now(),
        liveness: ProcessLiveness {
            pid: 0,
            pid_start_time: 0,
            boot_id: "not-the-real-boot-id".to_string(),
        },
    };
    store.write(&task, &inputs, &running).expect("write");
    assert!(store.is_stale_running(&task, &inputs).expect("stale check"));
}

#[test]
fn a_running_record_for_the_current_process_is_not_stale() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    let task = hash(b"task");
    let inputs = inputs_hash(&[hash(b"in")]);
    let running = ExecutionRecord::Running {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in")],
        started_at: Utc::now(),
        liveness: ProcessLiveness::current(),
    };
    store.write(&task, &inputs, &running).expect("write");
    assert!(!store.is_stale_running(&task, &inputs).expect("stale check"));
}

#[test]
fn distinct_task_or_inputs_hashes_get_distinct_directories() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    let task_a = hash(b"task-a");
    let task_b = hash(b"task-b");
    let inputs = inputs_hash(&[hash(b"in")]);
    let record = ExecutionRecord::Success {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in")],
        started_at: Utc::now(),
        completed_at: Utc::now(),
        output_hash: hash(b"out"),
    };
    store.write(&task_a, &inputs, &record).expect("write a");
    assert!(store.read(&task_b, &inputs).expect("read b").is_none());
    assert!(store.read(&task_a, &inputs).expect("read a").is_some());
}

#[test]
fn iter_all_enumerates_every_record_across_task_and_input_hashes() {
    let dir = tempdir().expect("tempdir");
    let store = ExecutionRecordStore::open(dir.path());
    assert!(store.iter_all().expect("iter_all empty").is_empty());

    let task_a = hash(b"task-a");
    let task_b = hash(b"task-b");
    let inputs_1 = inputs_hash(&[hash(b"in-1")]);
    let inputs_2 = inputs_hash(&[hash(b"in-2")]);
    let running = ExecutionRecord::Running {
        execution_id: "exec-1".to_string(),
        input_hashes: vec![hash(b"in-1")],
        started_at: Utc::now(),
        liveness: ProcessLiveness::current(),
    };
    let success = ExecutionRecord::Success {
        execution_id: "exec-2".to_string(),
        input_hashes: vec![hash(b"in-2")],
        started_at: Utc::now(),
        completed_at: Utc::now(),
        output_hash: hash(b"out"),
    };
    store.write(&task_a, &inputs_1, &running).expect("write running");
    store.write(&task_b, &inputs_2, &success).expect("write success");

    let mut all = store.iter_all().expect("iter_all");
    all.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].0, task_a);
    assert_eq!(all[0].1, inputs_1);
    assert_eq!(all[1].0, task_b);
    assert_eq!(all[1].1, inputs_2);
}
