use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod dispatch;

#[derive(Parser)]
#[command(name = "qme")]
#[command(about = "Queue, run and inspect shell and batch tasks", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/qme/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command as a new task
    Run {
        /// Command and arguments (a single argument is split like a shell would)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Show a task (the most recent one when no id is given)
    Get {
        /// Task ID
        task_id: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List tasks
    Ls {
        /// Only tasks of this executor
        executor: Option<String>,
    },

    /// Run an executor action on a task
    Exec {
        /// Task ID
        task_id: String,

        /// Action name (see `qme actions <task_id>`)
        action: String,

        /// Action option as key=value, repeatable
        #[arg(short = 'o', long = "option")]
        options: Vec<String>,
    },

    /// List the actions available for a task
    Actions {
        /// Task ID
        task_id: String,
    },

    /// Remove a task, or every task of an executor
    Rm {
        /// Task ID
        task_id: Option<String>,

        /// Remove all tasks of this executor
        #[arg(long)]
        executor: Option<String>,
    },

    /// Remove all tasks
    Clear {
        /// Skip the safety check
        #[arg(long)]
        force: bool,
    },

    /// Show or initialize the config file
    Config {
        /// Print the config path only
        #[arg(long)]
        path: bool,

        /// Write a sample config
        #[arg(long)]
        init: bool,
    },
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    use Commands::*;

    let config = cli.config.as_deref();

    match cli.command {
        Run { command } => {
            let ctx = dispatch::load_context(config)?;
            commands::run::run(&ctx, command).await?;
        }
        Get { task_id, json } => {
            let ctx = dispatch::load_context(config)?;
            commands::get::run(&ctx, task_id.as_deref(), json)?;
        }
        Ls { executor } => {
            let ctx = dispatch::load_context(config)?;
            commands::list::run(&ctx, executor.as_deref())?;
        }
        Exec {
            task_id,
            action,
            options,
        } => {
            let ctx = dispatch::load_context(config)?;
            commands::exec::run(&ctx, &task_id, &action, &options).await?;
        }
        Actions { task_id } => {
            let ctx = dispatch::load_context(config)?;
            commands::exec::list_actions(&ctx, &task_id)?;
        }
        Rm { task_id, executor } => {
            let ctx = dispatch::load_context(config)?;
            commands::remove::run(&ctx, task_id.as_deref(), executor.as_deref())?;
        }
        Clear { force } => {
            let ctx = dispatch::load_context(config)?;
            commands::remove::clear(&ctx, force)?;
        }
        Config { path, init } => {
            commands::config::run(config, path, init)?;
        }
    }

    Ok(())
}
