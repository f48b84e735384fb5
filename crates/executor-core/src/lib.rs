pub mod capture;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod registry;
pub mod shell;
pub mod store;
pub mod task;

pub use capture::{capture, capture_in, CapturedResult};
pub use command::Command;
pub use config::{Config, Environment, Settings};
pub use error::ExecutorError;
pub use executor::{
    ActionFuture, ActionOptions, ActionOutcome, ActionOutput, ActionTable, DataValue, Executor,
    ExecutorState, ExportRecord,
};
pub use registry::{ExecutorVariant, Registry};
pub use shell::ShellExecutor;
pub use store::{FileSystemStore, MemoryStore, TaskRecord, TaskStore};
pub use task::{Task, TaskId, TaskStatus};
