use crate::dispatch::Context;
use executor_core::executor::{ActionOptions, ActionOutcome, ActionOutput};
use executor_core::task::{Task, TaskId};

pub async fn run(
    ctx: &Context,
    task_id_str: &str,
    action: &str,
    options: &[String],
) -> anyhow::Result<()> {
    let task_id = TaskId::from_string(task_id_str.to_string());
    let mut task = Task::load(&task_id, &ctx.store, &ctx.registry)?;
    let options = ActionOptions::parse(options.iter().map(String::as_str))?;

    match task.run_action(action, &ctx.store, &options).await? {
        ActionOutcome::Completed(output) => print_output(&output)?,
        ActionOutcome::Unsupported { action, available } => {
            eprintln!(
                "Action '{}' is not supported by the {} executor.",
                action,
                task.executor().name()
            );
            if available.is_empty() {
                eprintln!("This executor has no actions.");
            } else {
                eprintln!("Available: {}", available.join(", "));
            }
        }
    }

    Ok(())
}

pub fn list_actions(ctx: &Context, task_id_str: &str) -> anyhow::Result<()> {
    let task_id = TaskId::from_string(task_id_str.to_string());
    let task = Task::load(&task_id, &ctx.store, &ctx.registry)?;
    let actions = task.executor().get_actions();
    if actions.is_empty() {
        println!("No actions for the {} executor.", task.executor().name());
    }
    for action in actions {
        println!("{}", action);
    }
    Ok(())
}

fn print_output(output: &ActionOutput) -> anyhow::Result<()> {
    match output {
        ActionOutput::Lines(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        ActionOutput::Captured(result) => {
            for line in result.output() {
                println!("{}", line);
            }
            for line in result.error() {
                eprintln!("{}", line);
            }
        }
        ActionOutput::Fields(_) | ActionOutput::Files(_) => {
            println!("{}", serde_json::to_string_pretty(output)?);
        }
    }
    Ok(())
}
