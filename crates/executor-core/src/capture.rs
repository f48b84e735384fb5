use crate::command::Command;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tracing::{debug, warn};

/// Return code reported when a process could not be started at all.
pub const SPAWN_FAILURE: i32 = -1;

/// Snapshot of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedResult {
    output: Vec<String>,
    error: Vec<String>,
    returncode: i32,
    pid: Option<u32>,
}

impl CapturedResult {
    pub fn new(output: Vec<String>, error: Vec<String>, returncode: i32, pid: Option<u32>) -> Self {
        Self {
            output,
            error,
            returncode,
            pid,
        }
    }

    fn spawn_failure(message: String) -> Self {
        Self::new(Vec::new(), vec![message], SPAWN_FAILURE, None)
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn error(&self) -> &[String] {
        &self.error
    }

    pub fn returncode(&self) -> i32 {
        self.returncode
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn success(&self) -> bool {
        self.returncode == 0
    }
}

/// Run a command to completion and collect everything it printed.
///
/// Failures to start the process are reported inside the result, never as an
/// error: the caller decides whether a non-zero return code fails the task.
pub async fn capture(command: &Command) -> CapturedResult {
    capture_in(command, None).await
}

/// Same as [`capture`], with the child started in `dir` when given.
pub async fn capture_in(command: &Command, dir: Option<&Path>) -> CapturedResult {
    let Some(program) = command.program() else {
        return CapturedResult::spawn_failure("Cannot run an empty command".to_string());
    };

    let mut cmd = tokio::process::Command::new(program);
    cmd.args(command.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    debug!("Spawning: {}", command);
    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to spawn '{}': {}", program, e);
            return CapturedResult::spawn_failure(format!("Failed to run {}: {}", program, e));
        }
    };

    let pid = child.id();
    let output = match child.wait_with_output().await {
        Ok(output) => output,
        Err(e) => {
            return CapturedResult::new(
                Vec::new(),
                vec![format!("Failed to wait for {}: {}", program, e)],
                SPAWN_FAILURE,
                pid,
            );
        }
    };

    let returncode = output.status.code().unwrap_or(SPAWN_FAILURE);
    debug!("Process {:?} exited with {}", pid, returncode);

    CapturedResult::new(
        split_lines(&output.stdout),
        split_lines(&output.stderr),
        returncode,
        pid,
    )
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|l| l.to_string())
        .collect()
}
