use crate::dispatch::Context;
use executor_core::{Command, Task};

pub async fn run(ctx: &Context, tokens: Vec<String>) -> anyhow::Result<()> {
    let command = match tokens.as_slice() {
        [line] => Command::parse(line),
        _ => Command::new(tokens),
    };

    let mut task = Task::new(command, &ctx.registry);
    let result = task.execute(&ctx.store).await;
    let record = task.record();

    for line in &record.data.output {
        println!("{}", line);
    }
    for line in &record.data.error {
        eprintln!("{}", line);
    }

    println!("Task {}:", record.uid);
    println!("  Executor: {}", record.executor);
    println!("  Status:   {}", record.data.status);
    println!(
        "  Return:   {}",
        record
            .data
            .returncode
            .map(|c| c.to_string())
            .unwrap_or_else(|| "N/A".into())
    );
    for (key, value) in &record.data.data {
        println!("  {:<9} {}", format!("{}:", key), value);
    }

    result?;
    Ok(())
}
