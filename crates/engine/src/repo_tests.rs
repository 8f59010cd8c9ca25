use super::*;
use tempfile::tempdir;

#[test]
fn an_empty_directory_is_not_a_valid_repo() {
    let dir = tempdir().expect("tempdir");
    assert!(!Repo::is_valid(dir.path()));
}

#[test]
fn init_creates_all_five_required_directories() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("repo");
    Repo::init(&root).expect("init");
    assert!(Repo::is_valid(&root));
    for name in ["objects", "packages", "workspaces", "executions", "tmp"] {
        assert!(root.join(name).is_dir(), "missing {name}");
    }
}

#[test]
fn init_twice_at_the_same_path_fails() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("repo");
    Repo::init(&root).expect("init 1");
    let err = Repo::init(&root).expect_err("init 2");
    assert!(matches!(err, EngineError::AlreadyInitialized(_)));
}

#[test]
fn open_on_a_never_initialized_path_fails() {
    let dir = tempdir().expect("tempdir");
    let err = Repo::open(dir.path()).expect_err("open");
    assert!(matches!(err, EngineError::InvalidRepo(_)));
}

#[test]
fn open_or_init_is_idempotent() {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("repo");
    let first = Repo::open_or_init(&root).expect("first");
    let label = first.label();
    drop(first);
    let second = Repo::open_or_init(&root).expect("second");
    assert_eq!(second.label(), label);
}
