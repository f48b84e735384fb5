use crate::dispatch::Context;
use executor_core::task::TaskId;

pub fn run(ctx: &Context, task_id: Option<&str>, executor: Option<&str>) -> anyhow::Result<()> {
    match (task_id, executor) {
        (Some(id), None) => {
            let task_id = TaskId::from_string(id.to_string());
            ctx.store.delete(&task_id)?;
            println!("{} has been removed.", task_id);
        }
        (None, Some(name)) => {
            ctx.store.delete_executor(name)?;
            println!("All {} tasks have been removed.", name);
        }
        (Some(_), Some(_)) => anyhow::bail!("Give either a task id or --executor, not both"),
        (None, None) => anyhow::bail!("Give a task id or --executor <name>"),
    }
    Ok(())
}

pub fn clear(ctx: &Context, force: bool) -> anyhow::Result<()> {
    if !force {
        println!(
            "This removes every task in {}. Re-run with --force to continue.",
            ctx.store.root().display()
        );
        return Ok(());
    }
    ctx.store.clear()?;
    println!("Database cleared.");
    Ok(())
}
