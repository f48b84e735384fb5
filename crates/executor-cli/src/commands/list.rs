use crate::dispatch::Context;

pub fn run(ctx: &Context, executor: Option<&str>) -> anyhow::Result<()> {
    let tasks = ctx.store.list(executor)?;
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!("{:<50} {:<10}", "TASK ID", "EXECUTOR");
    println!("{}", "-".repeat(60));
    for task in &tasks {
        println!("{:<50} {:<10}", task, task.executor_name());
    }

    Ok(())
}
