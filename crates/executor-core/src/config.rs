use crate::error::ExecutorError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of environment variables that override executor settings.
pub const ENV_PREFIX: &str = "QME";

/// Top-level configuration.
/// Loaded from ~/.config/qme/config.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory of the filesystem task database.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// Per-executor sections, addressed as `executor.<name>`.
    #[serde(default)]
    pub executor: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
}

impl Config {
    /// Load config from the default path, or an empty config when absent.
    pub fn load_default() -> Result<Self, ExecutorError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ExecutorError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ExecutorError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("qme")
            .join("config.yaml")
    }

    /// Database directory, falling back to the local data dir.
    pub fn database_dir(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join("qme")
                .join("database")
        })
    }

    /// Key/value pairs of a section such as `executor.slurm`.
    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, serde_yaml::Value>> {
        let executor = name.strip_prefix("executor.")?;
        self.executor.get(executor)
    }

    /// A scalar from a section, rendered as a string.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)?.get(key).and_then(scalar_to_string)
    }

    pub fn set(&mut self, executor: &str, key: &str, value: &str) {
        self.executor
            .entry(executor.to_string())
            .or_default()
            .insert(key.to_string(), serde_yaml::Value::String(value.to_string()));
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Where environment overrides are read from.
#[derive(Debug, Clone, Default)]
pub enum Environment {
    /// The process environment, read on every lookup.
    #[default]
    Process,
    /// A fixed set of variables.
    Fixed(HashMap<String, String>),
}

impl Environment {
    fn var(&self, name: &str) -> Option<String> {
        match self {
            Environment::Process => std::env::var(name).ok(),
            Environment::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Layered setting lookup: environment, then config section, then default.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    config: Config,
    env: Environment,
}

impl Settings {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            env: Environment::Process,
        }
    }

    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve `key` for `executor`.
    ///
    /// `QME_<EXECUTOR>_<KEY>` wins over `executor.<executor>` in the config
    /// file, which wins over `default`.
    pub fn get_setting(&self, executor: &str, key: &str, default: &str) -> String {
        let var = env_var_name(executor, key);
        if let Some(value) = self.env.var(&var) {
            debug!("Setting {}.{} from {}", executor, key, var);
            return value;
        }
        let section = format!("executor.{}", executor);
        if let Some(value) = self.config.get(&section, key) {
            debug!("Setting {}.{} from config section {}", executor, key, section);
            return value;
        }
        default.to_string()
    }
}

/// `QME_<EXECUTOR>_<KEY>`, uppercased with non-alphanumerics as underscores.
pub fn env_var_name(executor: &str, key: &str) -> String {
    format!("{}_{}_{}", ENV_PREFIX, executor, key)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
