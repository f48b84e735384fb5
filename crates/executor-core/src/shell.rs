use crate::capture::capture_in;
use crate::command::Command;
use crate::config::Settings;
use crate::error::ExecutorError;
use crate::executor::{ActionOptions, ActionOutcome, ActionTable, ExecutorState, ExportRecord};
use crate::registry::ExecutorVariant;
use crate::task::TaskStatus;
use crate::Executor;
use std::sync::Arc;
use tracing::info;

/// Shell executor: runs the command directly and captures its output.
/// Selected for every command no other variant claims.
pub struct ShellExecutor {
    state: ExecutorState,
    actions: ActionTable<ShellExecutor>,
}

impl ShellExecutor {
    pub const NAME: &'static str = "shell";

    pub fn new(command: Command) -> Self {
        Self::from_state(ExecutorState::new(command))
    }

    pub fn from_state(state: ExecutorState) -> Self {
        Self {
            state,
            actions: ActionTable::base(),
        }
    }

    pub fn variant() -> ExecutorVariant {
        ExecutorVariant::fallback(Self::NAME, build)
    }

    pub fn state(&self) -> &ExecutorState {
        &self.state
    }
}

fn build(command: Command, _settings: Arc<Settings>) -> Box<dyn Executor> {
    Box::new(ShellExecutor::new(command))
}

#[async_trait::async_trait]
impl Executor for ShellExecutor {
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
        info!(
            "'{}' finished with return code {}",
            self.state.command(),
            result.returncode()
        );
        self.state.record_capture(result);
        self.state.transition(TaskStatus::Complete)
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
