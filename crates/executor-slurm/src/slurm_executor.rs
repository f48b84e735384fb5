use executor_core::capture::{capture, capture_in};
use executor_core::config::Settings;
use executor_core::executor::{ActionFuture, ActionOutput};
use executor_core::registry::ExecutorVariant;
use executor_core::{
    ActionOptions, ActionOutcome, ActionTable, Command, Executor, ExecutorError, ExecutorState,
    ExportRecord, TaskStatus,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

/// Fields requested from `sacct` unless configured otherwise.
pub const DEFAULT_SACCT_FORMAT: &str = "JobID,JobName,Partition,Account,AllocCPUS,State,ExitCode";

/// sbatch options that take no value.
const SBATCH_SWITCHES: &[&str] = &[
    "--parsable",
    "--wait",
    "-W",
    "--hold",
    "-H",
    "--quiet",
    "-Q",
    "--verbose",
    "-v",
    "--exclusive",
    "--requeue",
    "--no-requeue",
    "--overcommit",
    "-O",
    "--contiguous",
    "--test-only",
    "--use-min-nodes",
    "--spread-job",
    "--oversubscribe",
    "-s",
    "--ignore-pbs",
    "--no-kill",
    "-k",
];

static JOB_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid job id regex"));

/// Slurm executor: submits batch jobs with `sbatch`, then polls, cancels and
/// reads output of the submitted job through actions.
///
/// Settings (env `QME_SLURM_<KEY>` or config section `executor.slurm`):
/// `sacct_format`, `sacct_command`, `scancel_command`.
pub struct SlurmExecutor {
    state: ExecutorState,
    settings: Arc<Settings>,
    actions: ActionTable<SlurmExecutor>,
}

impl SlurmExecutor {
    pub const NAME: &'static str = "slurm";
    pub const MATCHSTRING: &'static str = "^sbatch";

    pub fn new(command: Command, settings: Arc<Settings>) -> Self {
        Self::from_state(ExecutorState::new(command), settings)
    }

    pub fn from_state(state: ExecutorState, settings: Arc<Settings>) -> Self {
        let actions = ActionTable::<SlurmExecutor>::base()
            .with("status", status_action)
            .with("cancel", cancel_action)
            .with("output", output_action)
            .with("error", error_action)
            .with("outputs", outputs_action);
        Self {
            state,
            settings,
            actions: ActionTable::base().merge(actions),
        }
    }

    pub fn variant() -> ExecutorVariant {
        ExecutorVariant::new(Self::NAME, Self::MATCHSTRING, build)
    }

    pub fn state(&self) -> &ExecutorState {
        &self.state
    }

    fn setting(&self, key: &str, default: &str) -> String {
        self.settings.get_setting(Self::NAME, key, default)
    }

    /// Output and error paths: flags given to sbatch before the batch script
    /// verbatim, else `slurm-<jobid>.out` in the submission directory. Without
    /// `--error`, stderr shares the output file as it does under sbatch.
    fn output_paths(&self, jobid: &str) -> (String, String) {
        let command = sbatch_invocation(self.state.command());
        let output = command
            .option_value("--output", Some("-o"), SBATCH_SWITCHES)
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.state
                    .pwd()
                    .join(format!("slurm-{}.out", jobid))
                    .display()
                    .to_string()
            });
        let error = command
            .option_value("--error", Some("-e"), SBATCH_SWITCHES)
            .map(str::to_string)
            .unwrap_or_else(|| output.clone());
        (output, error)
    }

    async fn query_status(&mut self, data: &ExportRecord) -> Result<ActionOutput, ExecutorError> {
        let jobid = data.require_str("jobid")?;
        let format = self.setting("sacct_format", DEFAULT_SACCT_FORMAT);
        let command = Command::parse(&self.setting("sacct_command", "sacct")).with_args([
            "-j".to_string(),
            jobid.to_string(),
            format!("--format={}", format),
            "--noheader".to_string(),
            "--parsable2".to_string(),
        ]);

        let result = capture(&command).await;
        if !result.success() {
            warn!("sacct for job {} returned {}", jobid, result.returncode());
        }
        let fields = parse_sacct(&format, result.output());

        if self.state.status() == TaskStatus::Running {
            if let Some(status) = fields.get("State").and_then(|s| scheduler_state(s)) {
                info!("Job {} reached {}", jobid, status);
                self.state.transition(status)?;
            }
        }
        Ok(ActionOutput::Fields(fields))
    }

    async fn cancel(&mut self, data: &ExportRecord) -> Result<ActionOutput, ExecutorError> {
        let jobid = data.require_str("jobid")?;
        let command =
            Command::parse(&self.setting("scancel_command", "scancel")).with_args([jobid]);

        warn!("Cancelling slurm job {}", jobid);
        let result = capture(&command).await;
        if result.success() && self.state.status() == TaskStatus::Running {
            self.state.transition(TaskStatus::Cancelled)?;
        }
        Ok(ActionOutput::Captured(result))
    }
}

/// The command from the sbatch token onward, so wrappers such as
/// `env sbatch ...` are read the same as a bare `sbatch ...`.
fn sbatch_invocation(command: &Command) -> Command {
    let tokens = command.tokens();
    let start = tokens
        .iter()
        .position(|token| {
            Path::new(token)
                .file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with("sbatch"))
        })
        .unwrap_or(0);
    Command::new(tokens[start..].iter().cloned())
}

fn build(command: Command, settings: Arc<Settings>) -> Box<dyn Executor> {
    Box::new(SlurmExecutor::new(command, settings))
}

fn status_action<'a>(
    exec: &'a mut SlurmExecutor,
    data: &'a ExportRecord,
    _options: &'a ActionOptions,
) -> ActionFuture<'a> {
    Box::pin(exec.query_status(data))
}

fn cancel_action<'a>(
    exec: &'a mut SlurmExecutor,
    data: &'a ExportRecord,
    _options: &'a ActionOptions,
) -> ActionFuture<'a> {
    Box::pin(exec.cancel(data))
}

fn output_action<'a>(
    _exec: &'a mut SlurmExecutor,
    data: &'a ExportRecord,
    options: &'a ActionOptions,
) -> ActionFuture<'a> {
    Box::pin(async move {
        read_data_file(data, "output_file", options.get_usize("tail")).map(ActionOutput::Lines)
    })
}

fn error_action<'a>(
    _exec: &'a mut SlurmExecutor,
    data: &'a ExportRecord,
    options: &'a ActionOptions,
) -> ActionFuture<'a> {
    Box::pin(async move {
        read_data_file(data, "error_file", options.get_usize("tail")).map(ActionOutput::Lines)
    })
}

fn outputs_action<'a>(
    _exec: &'a mut SlurmExecutor,
    data: &'a ExportRecord,
    options: &'a ActionOptions,
) -> ActionFuture<'a> {
    Box::pin(async move {
        let tail = options.get_usize("tail");
        let mut files = BTreeMap::new();
        files.insert("output".to_string(), read_data_file(data, "output_file", tail)?);
        files.insert("error".to_string(), read_data_file(data, "error_file", tail)?);
        Ok(ActionOutput::Files(files))
    })
}

/// Lines of the file named by `key`, relative paths taken from the
/// submission directory. A file the scheduler has not written yet reads as empty.
fn read_data_file(
    data: &ExportRecord,
    key: &str,
    tail: Option<usize>,
) -> Result<Vec<String>, ExecutorError> {
    let Some(name) = data.get_str(key) else {
        return Ok(Vec::new());
    };
    let path = data.pwd.join(name);
    if !path.exists() {
        debug!("{} does not exist yet", path.display());
        return Ok(Vec::new());
    }
    let lines = read_lines(&path)?;
    Ok(match tail {
        Some(n) => lines[lines.len().saturating_sub(n)..].to_vec(),
        None => lines,
    })
}

fn read_lines(path: &Path) -> Result<Vec<String>, ExecutorError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(|l| l.to_string())
        .collect())
}

/// First run of digits in a submission line, e.g. `Submitted batch job 889074`.
pub fn parse_job_id(line: &str) -> Option<String> {
    JOB_ID_REGEX.find(line).map(|m| m.as_str().to_string())
}

/// Map the first non-empty line of `sacct --parsable2` output onto the
/// requested format fields. Width suffixes such as `JobName%30` are dropped.
pub fn parse_sacct(format: &str, lines: &[String]) -> BTreeMap<String, String> {
    let Some(line) = lines.iter().find(|l| !l.trim().is_empty()) else {
        return BTreeMap::new();
    };
    format
        .split(',')
        .map(|field| field.split('%').next().unwrap_or(field).trim().to_string())
        .zip(line.split('|').map(|v| v.trim().to_string()))
        .collect()
}

/// Task status implied by a Slurm job state, if the job is finished.
fn scheduler_state(state: &str) -> Option<TaskStatus> {
    let state = state.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
    if state.starts_with("CANCELLED") {
        return Some(TaskStatus::Cancelled);
    }
    match state.as_str() {
        "COMPLETED" | "FAILED" | "TIMEOUT" | "OUT_OF_MEMORY" | "NODE_FAIL" | "BOOT_FAIL"
        | "DEADLINE" | "PREEMPTED" => Some(TaskStatus::Complete),
        _ => None,
    }
}

#[async_trait::async_trait]
impl Executor for SlurmExecutor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn command(&self) -> &Command {
        self.state.command()
    }

    fn status(&self) -> TaskStatus {
        self.state.status()
    }

    async fn execute(&mut self, command: Option<Command>) -> Result<(), ExecutorError> {
        self.state.begin_execution(command)?;

        let result = capture_in(self.state.command(), Some(self.state.pwd())).await;
        let returncode = result.returncode();
        let first_line = result.output().first().cloned();
        self.state.record_capture(result);

        if returncode != 0 {
            warn!("Submission '{}' returned {}", self.state.command(), returncode);
            return self.state.transition(TaskStatus::Complete);
        }

        let Some(jobid) = first_line.as_deref().and_then(parse_job_id) else {
            self.state.transition(TaskStatus::Complete)?;
            return Err(ExecutorError::SubmissionUnparseable(format!(
                "no job id in output of '{}'",
                self.state.command()
            )));
        };

        info!("Submitted slurm job {}", jobid);
        let (output, error) = self.output_paths(&jobid);
        self.state.set_data("jobid", jobid);
        self.state.set_data("output_file", output);
        self.state.set_data("error_file", error);
        Ok(())
    }

    fn export(&self) -> ExportRecord {
        self.state.export()
    }

    fn restore(&mut self, record: &ExportRecord) {
        self.state.restore(record);
    }

    fn get_actions(&self) -> Vec<&'static str> {
        self.actions.names()
    }

    async fn run_action(
        &mut self,
        name: &str,
        data: &ExportRecord,
        options: &ActionOptions,
    ) -> Result<ActionOutcome, ExecutorError> {
        let Some(action) = self.actions.get(name) else {
            return Ok(self.actions.unsupported(name));
        };
        action(self, data, options).await.map(ActionOutcome::Completed)
    }
}
