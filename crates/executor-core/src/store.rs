use crate::error::ExecutorError;
use crate::executor::ExportRecord;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;
use tracing::{debug, info};

/// A task as persisted: the executor's export plus the identity the task
/// layer adds around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub executor: String,
    pub uid: TaskId,
    pub data: ExportRecord,
}

impl TaskRecord {
    pub fn new(uid: TaskId, executor: &str, data: ExportRecord) -> Self {
        Self {
            executor: executor.to_string(),
            uid,
            data,
        }
    }
}

/// Storage the task layer reads from and writes to.
pub trait TaskStore: Send + Sync {
    fn load(&self, id: &TaskId) -> Result<Option<TaskRecord>, ExecutorError>;

    fn save(&self, record: &TaskRecord) -> Result<(), ExecutorError>;
}

/// Stores each task as `<root>/<executor>/<taskid>.json`.
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Open the database at `root`, creating it when missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ExecutorError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn executor_dir(&self, executor: &str) -> PathBuf {
        self.root.join(executor)
    }

    fn task_path(&self, executor: &str, id: &TaskId) -> PathBuf {
        self.executor_dir(executor).join(format!("{}.json", id))
    }

    /// Where a task is stored. Generated ids name their executor folder;
    /// caller-chosen ids are looked up across every executor.
    fn find_task(&self, id: &TaskId) -> Result<Option<PathBuf>, ExecutorError> {
        let hinted = self.task_path(id.executor_name(), id);
        if hinted.is_file() {
            return Ok(Some(hinted));
        }
        for name in self.executors()? {
            let path = self.task_path(&name, id);
            if path.is_file() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Executors that have a folder in the database.
    pub fn executors(&self) -> Result<Vec<String>, ExecutorError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Task ids, optionally limited to one executor.
    pub fn list(&self, executor: Option<&str>) -> Result<Vec<TaskId>, ExecutorError> {
        let executors = match executor {
            Some(name) => vec![name.to_string()],
            None => self.executors()?,
        };
        let mut ids = Vec::new();
        for name in executors {
            for (id, _) in self.task_files(&name)? {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// The most recently written task.
    pub fn latest(&self) -> Result<Option<TaskId>, ExecutorError> {
        let mut newest: Option<(SystemTime, TaskId)> = None;
        for name in self.executors()? {
            for (id, path) in self.task_files(&name)? {
                let modified = std::fs::metadata(&path)?.modified()?;
                if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                    newest = Some((modified, id));
                }
            }
        }
        Ok(newest.map(|(_, id)| id))
    }

    pub fn delete(&self, id: &TaskId) -> Result<(), ExecutorError> {
        let Some(path) = self.find_task(id)? else {
            return Err(ExecutorError::TaskNotFound(id.to_string()));
        };
        std::fs::remove_file(&path)?;
        info!("{} has been removed", id);
        Ok(())
    }

    /// Remove every task of one executor.
    pub fn delete_executor(&self, name: &str) -> Result<(), ExecutorError> {
        let dir = self.executor_dir(name);
        if !dir.is_dir() {
            return Err(ExecutorError::ExecutorNotFound(name.to_string()));
        }
        std::fs::remove_dir_all(&dir)?;
        info!("Removed all {} tasks", name);
        Ok(())
    }

    /// Remove every task.
    pub fn clear(&self) -> Result<(), ExecutorError> {
        for name in self.executors()? {
            let dir = self.executor_dir(&name);
            info!("Removing {}", dir.display());
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }

    fn task_files(&self, executor: &str) -> Result<Vec<(TaskId, PathBuf)>, ExecutorError> {
        let dir = self.executor_dir(executor);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    let id = TaskId::from_string(stem.to_string_lossy().into_owned());
                    files.push((id, path));
                }
            }
        }
        Ok(files)
    }
}

impl TaskStore for FileSystemStore {
    fn load(&self, id: &TaskId) -> Result<Option<TaskRecord>, ExecutorError> {
        let Some(path) = self.find_task(id)? else {
            return Ok(None);
        };
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, record: &TaskRecord) -> Result<(), ExecutorError> {
        let dir = self.executor_dir(&record.executor);
        std::fs::create_dir_all(&dir)?;
        let path = self.task_path(&record.executor, &record.uid);
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

/// In-memory store. Nothing survives the process; a poisoned lock is read through.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TaskStore for MemoryStore {
    fn load(&self, id: &TaskId) -> Result<Option<TaskRecord>, ExecutorError> {
        let records = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(id).cloned())
    }

    fn save(&self, record: &TaskRecord) -> Result<(), ExecutorError> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        records.insert(record.uid.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::executor::ExecutorState;

    #[test]
    fn poisoned_memory_store_keeps_its_records() {
        let store = MemoryStore::new();
        let state = ExecutorState::new(Command::parse("echo hi"));
        let record = TaskRecord::new(TaskId::new("shell"), "shell", state.export());
        store.save(&record).unwrap();

        let result = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = store.records.write().unwrap();
                    panic!("poison the lock");
                })
                .join()
        });
        assert!(result.is_err());
        assert!(store.records.is_poisoned());

        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&record.uid).unwrap(), Some(record.clone()));
        let other = TaskRecord::new(TaskId::new("shell"), "shell", record.data.clone());
        store.save(&other).unwrap();
        assert_eq!(store.len(), 2);
    }
}
