use crate::task::TaskStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Executor variant '{0}' does not define a matchstring")]
    MissingMatchstring(String),

    #[error("Invalid matchstring for executor '{name}': {source}")]
    InvalidMatchstring {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("Executor not found: {0}")]
    ExecutorNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task already executed: {0}")]
    AlreadyExecuted(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("Could not parse submission result: {0}")]
    SubmissionUnparseable(String),

    #[error("Task data is missing required field '{0}'")]
    MissingField(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
