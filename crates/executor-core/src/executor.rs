use crate::capture::CapturedResult;
use crate::command::Command;
use crate::error::ExecutorError;
use crate::task::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, warn};

/// Core executor trait. Every executor variant implements this.
///
/// An executor is bound to one command. `execute` runs it, `export` produces
/// the record handed to storage, and actions operate on already-submitted work
/// using the data from that record.
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    /// Short variant name, persisted with each task ("shell", "slurm").
    fn name(&self) -> &str;

    fn command(&self) -> &Command;

    fn status(&self) -> TaskStatus;

    /// Run the bound command, or `command` instead when one is supplied.
    async fn execute(&mut self, command: Option<Command>) -> Result<(), ExecutorError>;

    /// Common fields plus variant data. Never includes the task id or executor name.
    fn export(&self) -> ExportRecord;

    /// Rehydrate state from a previously exported record.
    fn restore(&mut self, record: &ExportRecord);

    fn get_actions(&self) -> Vec<&'static str>;

    /// Run a named action against `data`, the task's last exported record.
    /// Unknown names yield [`ActionOutcome::Unsupported`].
    async fn run_action(
        &mut self,
        name: &str,
        data: &ExportRecord,
        options: &ActionOptions,
    ) -> Result<ActionOutcome, ExecutorError>;

    fn summary(&self) -> String {
        format!("[{}] {} ({})", self.name(), self.command(), self.status())
    }
}

/// A primitive value stored in an executor's data bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl DataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Boolean(b) => write!(f, "{}", b),
            DataValue::Integer(i) => write!(f, "{}", i),
            DataValue::Float(x) => write!(f, "{}", x),
            DataValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Integer(i)
    }
}

impl From<f64> for DataValue {
    fn from(x: f64) -> Self {
        DataValue::Float(x)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Boolean(b)
    }
}

pub type DataBag = BTreeMap<String, DataValue>;

/// Keys owned by [`ExportRecord`] itself; variant data may not shadow them.
const RESERVED_KEYS: &[&str] = &[
    "command",
    "status",
    "user",
    "pwd",
    "timestamp",
    "output",
    "error",
    "returncode",
    "pid",
];

/// The record an executor exports for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub command: Command,
    pub status: TaskStatus,
    pub user: String,
    pub pwd: PathBuf,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub returncode: Option<i32>,
    #[serde(default)]
    pub pid: Option<u32>,
    #[serde(flatten)]
    pub data: DataBag,
}

impl ExportRecord {
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(DataValue::as_str)
    }

    /// A string field an action cannot proceed without.
    pub fn require_str(&self, key: &str) -> Result<&str, ExecutorError> {
        self.get_str(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ExecutorError::MissingField(key.to_string()))
    }
}

/// State shared by every executor variant.
#[derive(Debug, Clone)]
pub struct ExecutorState {
    command: Command,
    status: TaskStatus,
    user: String,
    pwd: PathBuf,
    timestamp: DateTime<Utc>,
    capture: Option<CapturedResult>,
    data: DataBag,
}

impl ExecutorState {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            status: TaskStatus::Running,
            user: current_user(),
            pwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            timestamp: Utc::now(),
            capture: None,
            data: DataBag::new(),
        }
    }

    /// Override the submission directory.
    pub fn with_pwd(mut self, pwd: impl Into<PathBuf>) -> Self {
        self.pwd = pwd.into();
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn transition(&mut self, to: TaskStatus) -> Result<(), ExecutorError> {
        let next = self.status.transition(to)?;
        if next != self.status {
            debug!("Status {} -> {} for '{}'", self.status, next, self.command);
        }
        self.status = next;
        Ok(())
    }

    pub fn pwd(&self) -> &Path {
        &self.pwd
    }

    pub fn capture(&self) -> Option<&CapturedResult> {
        self.capture.as_ref()
    }

    pub fn record_capture(&mut self, capture: CapturedResult) {
        self.capture = Some(capture);
    }

    pub fn data(&self) -> &DataBag {
        &self.data
    }

    pub fn set_data(&mut self, key: &str, value: impl Into<DataValue>) {
        if RESERVED_KEYS.contains(&key) {
            warn!("Ignoring data key '{}': reserved by the export record", key);
            return;
        }
        self.data.insert(key.to_string(), value.into());
    }

    /// Guard against a second execution and swap in a supplied command.
    ///
    /// An executor runs once: after it has a capture or reached a terminal
    /// status, further calls are rejected.
    pub fn begin_execution(&mut self, command: Option<Command>) -> Result<(), ExecutorError> {
        if self.capture.is_some() || self.status.is_terminal() {
            return Err(ExecutorError::AlreadyExecuted(self.command.to_string()));
        }
        if let Some(command) = command {
            self.command = command;
        }
        Ok(())
    }

    pub fn export(&self) -> ExportRecord {
        let (output, error, returncode, pid) = match &self.capture {
            Some(c) => (
                c.output().to_vec(),
                c.error().to_vec(),
                Some(c.returncode()),
                c.pid(),
            ),
            None => (Vec::new(), Vec::new(), None, None),
        };
        ExportRecord {
            command: self.command.clone(),
            status: self.status,
            user: self.user.clone(),
            pwd: self.pwd.clone(),
            timestamp: self.timestamp,
            output,
            error,
            returncode,
            pid,
            data: self.data.clone(),
        }
    }

    pub fn restore(&mut self, record: &ExportRecord) {
        self.command = record.command.clone();
        self.status = record.status;
        self.user = record.user.clone();
        self.pwd = record.pwd.clone();
        self.timestamp = record.timestamp;
        self.capture = record.returncode.map(|rc| {
            CapturedResult::new(record.output.clone(), record.error.clone(), rc, record.pid)
        });
        self.data = record.data.clone();
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Extra keyword options for an action, e.g. `tail=20`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOptions(BTreeMap<String, String>);

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    /// Parse `key=value` pairs.
    pub fn parse<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self, ExecutorError> {
        let mut options = Self::new();
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| ExecutorError::Config(format!("Expected key=value, got '{}'", pair)))?;
            options.0.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(options)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

/// What a supported action produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    Fields(BTreeMap<String, String>),
    Lines(Vec<String>),
    Files(BTreeMap<String, Vec<String>>),
    Captured(CapturedResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(ActionOutput),
    /// The executor has no action by that name.
    Unsupported {
        action: String,
        available: Vec<&'static str>,
    },
}

impl ActionOutcome {
    pub fn is_supported(&self) -> bool {
        matches!(self, ActionOutcome::Completed(_))
    }

    pub fn output(&self) -> Option<&ActionOutput> {
        match self {
            ActionOutcome::Completed(output) => Some(output),
            ActionOutcome::Unsupported { .. } => None,
        }
    }
}

pub type ActionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ActionOutput, ExecutorError>> + Send + 'a>>;

/// An action bound to executor type `E`.
pub type ActionFn<E> =
    for<'a> fn(&'a mut E, &'a ExportRecord, &'a ActionOptions) -> ActionFuture<'a>;

/// Named actions of an executor variant.
///
/// Built by merging the base table with the variant's own table when the
/// executor is constructed; variant entries win on a name clash.
pub struct ActionTable<E> {
    actions: BTreeMap<&'static str, ActionFn<E>>,
}

impl<E> ActionTable<E> {
    /// Actions every executor has. Currently none.
    pub fn base() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &'static str, action: ActionFn<E>) -> Self {
        self.actions.insert(name, action);
        self
    }

    pub fn merge(mut self, other: ActionTable<E>) -> Self {
        self.actions.extend(other.actions);
        self
    }

    pub fn get(&self, name: &str) -> Option<ActionFn<E>> {
        self.actions.get(name).copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.actions.keys().copied().collect()
    }

    pub fn unsupported(&self, name: &str) -> ActionOutcome {
        debug!("Unsupported action '{}'", name);
        ActionOutcome::Unsupported {
            action: name.to_string(),
            available: self.names(),
        }
    }
}

impl<E> fmt::Debug for ActionTable<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.actions.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_values_roundtrip_untagged() {
        let mut state = ExecutorState::new(Command::parse("echo hi"));
        state.set_data("jobid", "889074");
        state.set_data("attempts", 2i64);
        state.set_data("ratio", 0.5f64);
        state.set_data("array", true);

        let json = serde_json::to_value(state.export()).unwrap();
        assert_eq!(json["jobid"], "889074");
        assert_eq!(json["attempts"], 2);
        assert_eq!(json["array"], true);

        let back: ExportRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.get("attempts"), Some(&DataValue::Integer(2)));
        assert_eq!(back.get("ratio"), Some(&DataValue::Float(0.5)));
        assert_eq!(back.get_str("jobid"), Some("889074"));
    }

    #[test]
    fn reserved_keys_are_not_shadowed() {
        let mut state = ExecutorState::new(Command::parse("true"));
        state.set_data("status", "bogus");
        assert!(state.data().is_empty());
        assert_eq!(state.export().status, TaskStatus::Running);
    }

    #[test]
    fn second_execution_is_rejected() {
        let mut state = ExecutorState::new(Command::parse("true"));
        state.begin_execution(None).unwrap();
        state.record_capture(CapturedResult::new(vec![], vec![], 0, Some(1)));
        assert!(matches!(
            state.begin_execution(None),
            Err(ExecutorError::AlreadyExecuted(_))
        ));
    }

    #[test]
    fn restore_rebuilds_capture() {
        let mut state = ExecutorState::new(Command::parse("echo hi"));
        state.record_capture(CapturedResult::new(vec!["hi".into()], vec![], 0, Some(42)));
        state.transition(TaskStatus::Complete).unwrap();
        let record = state.export();

        let mut fresh = ExecutorState::new(Command::default());
        fresh.restore(&record);
        assert_eq!(fresh.status(), TaskStatus::Complete);
        assert_eq!(fresh.capture().map(|c| c.pid()), Some(Some(42)));
        assert_eq!(fresh.export(), record);
    }

    #[test]
    fn require_str_rejects_missing_and_empty() {
        let mut state = ExecutorState::new(Command::parse("true"));
        state.set_data("jobid", "");
        let record = state.export();
        assert!(matches!(
            record.require_str("jobid"),
            Err(ExecutorError::MissingField(f)) if f == "jobid"
        ));
        assert!(record.require_str("nope").is_err());
    }

    #[test]
    fn options_parse_pairs() {
        let opts = ActionOptions::parse(["tail=5", "mode = full"]).unwrap();
        assert_eq!(opts.get_usize("tail"), Some(5));
        assert_eq!(opts.get("mode"), Some("full"));
        assert!(ActionOptions::parse(["broken"]).is_err());
    }
}
