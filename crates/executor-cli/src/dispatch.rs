use executor_core::config::{Config, Settings};
use executor_core::error::ExecutorError;
use executor_core::registry::Registry;
use executor_core::store::FileSystemStore;
use executor_slurm::SlurmExecutor;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: resolved executors and the task database.
pub struct Context {
    pub registry: Registry,
    pub store: FileSystemStore,
}

/// Registry of all executors in priority order, shell last.
pub fn build_registry(settings: Arc<Settings>) -> Result<Registry, ExecutorError> {
    let mut registry = Registry::new(settings);
    registry.register(SlurmExecutor::variant())?;
    Ok(registry)
}

pub fn load_config(path: Option<&Path>) -> Result<Config, ExecutorError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load_default(),
    }
}

pub fn load_context(config_path: Option<&Path>) -> anyhow::Result<Context> {
    let config = load_config(config_path)?;
    let database = config.database_dir();
    debug!("Using database at {}", database.display());

    let store = FileSystemStore::open(database)?;
    let registry = build_registry(Arc::new(Settings::new(config)))?;
    Ok(Context { registry, store })
}

#[cfg(test)]
mod tests {
    use super::*;
    use executor_core::Command;

    #[test]
    fn registry_prefers_slurm_for_sbatch() {
        let registry = build_registry(Arc::new(Settings::default())).unwrap();
        assert_eq!(registry.names(), vec!["slurm", "shell"]);
        assert_eq!(registry.resolve(Command::parse("sbatch job.sh")).name(), "slurm");
        assert_eq!(registry.resolve(Command::parse("echo hi")).name(), "shell");
    }

    #[test]
    fn context_uses_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("db");
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, format!("database: {}\n", database.display())).unwrap();

        let ctx = load_context(Some(&config_path)).unwrap();
        assert_eq!(ctx.store.root(), database.as_path());
        assert!(database.is_dir());
    }
}
