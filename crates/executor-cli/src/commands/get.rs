use crate::dispatch::Context;
use executor_core::store::{TaskRecord, TaskStore};
use executor_core::task::TaskId;

pub fn run(ctx: &Context, task_id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let task_id = match task_id {
        Some(id) => TaskId::from_string(id.to_string()),
        None => match ctx.store.latest()? {
            Some(id) => id,
            None => anyhow::bail!("No tasks in the database"),
        },
    };

    let Some(record) = ctx.store.load(&task_id)? else {
        anyhow::bail!("{} does not exist in the database", task_id)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }

    Ok(())
}

fn print_record(record: &TaskRecord) {
    let data = &record.data;
    println!("Task:      {}", record.uid);
    println!("Executor:  {}", record.executor);
    println!("Command:   {}", data.command);
    println!("Status:    {}", data.status);
    println!("User:      {}", data.user);
    println!("Directory: {}", data.pwd.display());
    println!("Submitted: {}", data.timestamp);
    println!(
        "PID:       {}",
        data.pid.map(|p| p.to_string()).unwrap_or_else(|| "N/A".into())
    );
    if let Some(code) = data.returncode {
        println!("Return:    {}", code);
    }
    for (key, value) in &data.data {
        println!("{:<10} {}", format!("{}:", key), value);
    }
    if !data.output.is_empty() {
        println!("Output:");
        for line in &data.output {
            println!("  {}", line);
        }
    }
    if !data.error.is_empty() {
        println!("Error:");
        for line in &data.error {
            println!("  {}", line);
        }
    }
}
