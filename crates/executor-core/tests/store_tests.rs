use executor_core::store::{FileSystemStore, MemoryStore, TaskRecord, TaskStore};
use executor_core::{Command, ExecutorError, ExecutorState, TaskId};

fn record(executor: &str, line: &str) -> TaskRecord {
    let mut state = ExecutorState::new(Command::parse(line));
    state.set_data("jobid", "12");
    TaskRecord::new(TaskId::new(executor), executor, state.export())
}

#[test]
fn filesystem_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open(dir.path().join("database")).unwrap();
    let rec = record("shell", "echo hi");
    store.save(&rec).unwrap();

    let path = dir
        .path()
        .join("database")
        .join("shell")
        .join(format!("{}.json", rec.uid));
    assert!(path.exists());

    let loaded = store.load(&rec.uid).unwrap().unwrap();
    assert_eq!(loaded, rec);
    assert_eq!(loaded.data.get_str("jobid"), Some("12"));
}

#[test]
fn persisted_shape() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open(dir.path()).unwrap();
    let rec = record("slurm", "sbatch job.sh");
    store.save(&rec).unwrap();

    let raw = std::fs::read_to_string(dir.path().join("slurm").join(format!("{}.json", rec.uid)))
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["executor"], "slurm");
    assert_eq!(json["uid"], rec.uid.as_str());
    assert_eq!(json["data"]["status"], "running");
    assert_eq!(json["data"]["command"][0], "sbatch");
    assert_eq!(json["data"]["jobid"], "12");
}

#[test]
fn missing_task_loads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open(dir.path()).unwrap();
    assert!(store.load(&TaskId::new("shell")).unwrap().is_none());
}

#[test]
fn list_latest_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open(dir.path()).unwrap();
    let a = record("shell", "echo a");
    let b = record("slurm", "sbatch b.sh");
    store.save(&a).unwrap();
    store.save(&b).unwrap();

    assert_eq!(store.executors().unwrap(), vec!["shell", "slurm"]);
    assert_eq!(store.list(Some("slurm")).unwrap(), vec![b.uid.clone()]);
    assert_eq!(store.list(None).unwrap().len(), 2);
    let latest = store.latest().unwrap().unwrap();
    assert!(latest == a.uid || latest == b.uid);

    store.delete(&a.uid).unwrap();
    assert!(store.load(&a.uid).unwrap().is_none());
    assert!(matches!(store.delete(&a.uid), Err(ExecutorError::TaskNotFound(_))));

    store.delete_executor("slurm").unwrap();
    assert!(matches!(
        store.delete_executor("slurm"),
        Err(ExecutorError::ExecutorNotFound(_))
    ));
    assert!(store.list(None).unwrap().is_empty());
}

#[test]
fn clear_removes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open(dir.path()).unwrap();
    store.save(&record("shell", "echo a")).unwrap();
    store.save(&record("slurm", "sbatch a")).unwrap();
    store.clear().unwrap();
    assert!(store.executors().unwrap().is_empty());
    assert_eq!(store.latest().unwrap(), None);
}

#[test]
fn memory_store_roundtrip() {
    let store = MemoryStore::new();
    assert!(store.is_empty());
    let rec = record("shell", "true");
    store.save(&rec).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.load(&rec.uid).unwrap(), Some(rec));
}

#[test]
fn caller_chosen_ids_are_found_in_any_executor_folder() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileSystemStore::open(dir.path()).unwrap();
    let state = ExecutorState::new(Command::parse("sbatch nightly.sh"));
    let rec = TaskRecord::new(TaskId::from_string("nightly-7".into()), "slurm", state.export());
    store.save(&rec).unwrap();

    assert!(dir.path().join("slurm").join("nightly-7.json").exists());
    assert_eq!(store.load(&rec.uid).unwrap(), Some(rec.clone()));
    assert_eq!(store.list(None).unwrap(), vec![rec.uid.clone()]);

    store.delete(&rec.uid).unwrap();
    assert!(store.load(&rec.uid).unwrap().is_none());
}
