use crate::dispatch;
use executor_core::Config;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# qme configuration

# Where task records are stored (defaults to the local data directory)
# database: /home/me/.local/share/qme/database

executor:
  slurm:
    # Fields requested from sacct by the status action.
    # Overridden by QME_SLURM_SACCT_FORMAT.
    sacct_format: JobID,JobName,Partition,Account,AllocCPUS,State,ExitCode
"#;

pub fn run(config_path: Option<&Path>, path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    println!("Config path: {}", config_path.display());
    if config_path.exists() {
        let config = dispatch::load_config(Some(&config_path))?;
        println!("Database:    {}", config.database_dir().display());
        for (name, section) in &config.executor {
            println!("  [executor.{}]", name);
            for key in section.keys() {
                println!("    {}", key);
            }
        }
    } else {
        println!("Status:      not found");
        println!("Run `qme config --init` to create one.");
    }

    Ok(())
}
