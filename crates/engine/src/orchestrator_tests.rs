use super::*;
use e3_core::{FakeClock, Hash, SequentialIdGen};
use e3_package::builder::{PackageBuilder, TaskDecl};
use e3_runner::{MockTaskRunner, TaskResult};
use e3_store::GcOptions;
use tempfile::tempdir;

fn build_engine(dir: &std::path::Path, runner: Arc<dyn TaskRunner>) -> Engine {
    let repo = Repo::init(dir.join("repo")).expect("init repo");
    Engine::new(repo, runner, Arc::new(FakeClock::new(0)), Arc::new(SequentialIdGen::new("exec")))
}

fn deploy_single_task(engine: &Engine, name: &str) {
    let (_hash, zip) = PackageBuilder::new(engine.repo().objects(), "pkg", "1.0.0")
        .input_with_default("seed", "string", serde_json::json!("seed"))
        .output("result")
        .task(TaskDecl {
            name: "only".to_string(),
            command_ir: b"echo".to_vec(),
            inputs: vec!["inputs.seed".into()],
            output: "outputs.result".into(),
        })
        .build();
    engine.import_package(&zip, false).expect("import");
    engine.create_workspace(name).expect("create");
    engine.deploy_workspace(name, "pkg@1.0.0").expect("deploy");
}

#[tokio::test]
async fn start_then_wait_runs_a_single_task_workspace_to_completion() {
    let dir = tempdir().expect("tempdir");
    let runner = Arc::new(MockTaskRunner::new());
    runner.set_default(TaskResult::Success {
        output_hash: Hash::of_bytes(b"out"),
    });
    let engine = build_engine(dir.path(), runner.clone());
    deploy_single_task(&engine, "w1");

    let handle = engine.start("w1", StartOptions::default()).await.expect("start");
    let outcome = engine.wait(&handle).await.expect("wait");

    assert!(outcome.success);
    assert_eq!(outcome.executed, 1);
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn status_reflects_a_settled_execution_and_wait_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let runner = Arc::new(MockTaskRunner::new());
    runner.set_default(TaskResult::Success {
        output_hash: Hash::of_bytes(b"out"),
    });
    let engine = build_engine(dir.path(), runner);
    deploy_single_task(&engine, "w1");

    let handle = engine.start("w1", StartOptions::default()).await.expect("start");
    engine.wait(&handle).await.expect("wait 1");

    let summary = engine.status(&handle).expect("status");
    assert_eq!(summary.completed, vec!["only".to_string()]);
    assert!(summary.failed.is_empty());

    // The in-flight handle was already consumed by the first `wait`;
    // a second call falls back to the now-persisted terminal state.
    let outcome = engine.wait(&handle).await.expect("wait 2");
    assert!(outcome.success);
}

#[tokio::test]
async fn get_events_only_returns_events_after_the_given_sequence() {
    let dir = tempdir().expect("tempdir");
    let runner = Arc::new(MockTaskRunner::new());
    runner.set_default(TaskResult::Success {
        output_hash: Hash::of_bytes(b"out"),
    });
    let engine = build_engine(dir.path(), runner);
    deploy_single_task(&engine, "w1");

    let handle = engine.start("w1", StartOptions::default()).await.expect("start");
    engine.wait(&handle).await.expect("wait");

    let all = engine.get_events(&handle, 0).expect("all events");
    assert!(all.len() >= 3); // started, task ready/started/completed, execution completed
    let since_first = engine.get_events(&handle, 1).expect("events since 1");
    assert_eq!(since_first.len(), all.len() - 1);
}

#[tokio::test]
async fn cancelling_a_workspace_with_no_running_execution_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let engine = build_engine(dir.path(), Arc::new(MockTaskRunner::new()));
    let handle = ExecutionHandle {
        id: e3_core::ExecutionId::new("exec-nope"),
        repo: engine.repo().label(),
        workspace: "never-started".to_string(),
    };
    let err = engine.cancel(&handle).expect_err("not running");
    assert!(matches!(err, EngineError::NotRunning(_)));
}

#[tokio::test]
async fn gc_keeps_everything_reachable_from_a_deployed_workspace() {
    let dir = tempdir().expect("tempdir");
    let runner = Arc::new(MockTaskRunner::new());
    runner.set_default(TaskResult::Success {
        output_hash: Hash::of_bytes(b"out"),
    });
    let engine = build_engine(dir.path(), runner);
    deploy_single_task(&engine, "w1");
    let handle = engine.start("w1", StartOptions::default()).await.expect("start");
    engine.wait(&handle).await.expect("wait");

    let opts = GcOptions {
        dry_run: true,
        min_age: std::time::Duration::ZERO,
        retain_execution_outputs: false,
    };
    let report = engine.gc(&opts).expect("gc");
    assert!(report.retained_objects > 0);
    assert_eq!(report.deleted_objects, 0);
}
