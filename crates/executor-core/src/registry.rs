use crate::command::Command;
use crate::config::Settings;
use crate::error::ExecutorError;
use crate::shell::ShellExecutor;
use crate::Executor;
use regex::Regex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds an executor bound to a command.
pub type ExecutorFactory = fn(Command, Arc<Settings>) -> Box<dyn Executor>;

/// A registrable executor variant.
#[derive(Clone)]
pub struct ExecutorVariant {
    pub name: &'static str,
    /// Regex searched in the serialized command. Required for all but the fallback.
    pub matchstring: Option<&'static str>,
    pub factory: ExecutorFactory,
}

impl ExecutorVariant {
    pub fn new(name: &'static str, matchstring: &'static str, factory: ExecutorFactory) -> Self {
        Self {
            name,
            matchstring: Some(matchstring),
            factory,
        }
    }

    /// A variant chosen only when nothing else matches.
    pub fn fallback(name: &'static str, factory: ExecutorFactory) -> Self {
        Self {
            name,
            matchstring: None,
            factory,
        }
    }
}

impl fmt::Debug for ExecutorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorVariant")
            .field("name", &self.name)
            .field("matchstring", &self.matchstring)
            .finish()
    }
}

/// Ordered set of executor variants with a shell fallback.
///
/// Variants are tried in registration order; the first whose matchstring is
/// found in the command wins.
#[derive(Debug)]
pub struct Registry {
    variants: Vec<(Regex, ExecutorVariant)>,
    fallback: ExecutorVariant,
    settings: Arc<Settings>,
}

impl Registry {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            variants: Vec::new(),
            fallback: ShellExecutor::variant(),
            settings,
        }
    }

    /// Add a variant after those already registered.
    ///
    /// Fails when the variant has no matchstring or it does not compile.
    pub fn register(&mut self, variant: ExecutorVariant) -> Result<&mut Self, ExecutorError> {
        let pattern = variant
            .matchstring
            .ok_or_else(|| ExecutorError::MissingMatchstring(variant.name.to_string()))?;
        let regex = Regex::new(pattern).map_err(|source| ExecutorError::InvalidMatchstring {
            name: variant.name.to_string(),
            source,
        })?;
        debug!("Registered executor '{}' ({})", variant.name, pattern);
        self.variants.push((regex, variant));
        Ok(self)
    }

    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Names in priority order, fallback last.
    pub fn names(&self) -> Vec<&'static str> {
        self.variants
            .iter()
            .map(|(_, v)| v.name)
            .chain(std::iter::once(self.fallback.name))
            .collect()
    }

    /// The variant that would run `command`.
    pub fn matching(&self, command: &Command) -> &ExecutorVariant {
        let serialized = command.serialized();
        self.variants
            .iter()
            .find(|(regex, _)| regex.is_match(&serialized))
            .map(|(_, variant)| variant)
            .unwrap_or(&self.fallback)
    }

    /// Build the executor for `command`. Always succeeds.
    pub fn resolve(&self, command: Command) -> Box<dyn Executor> {
        let variant = self.matching(&command);
        debug!("Resolved '{}' to executor '{}'", command, variant.name);
        (variant.factory)(command, Arc::clone(&self.settings))
    }

    /// Build a specific executor by name, as when reloading a stored task.
    pub fn named(&self, name: &str, command: Command) -> Result<Box<dyn Executor>, ExecutorError> {
        let variant = self
            .variants
            .iter()
            .map(|(_, v)| v)
            .chain(std::iter::once(&self.fallback))
            .find(|v| v.name == name)
            .ok_or_else(|| ExecutorError::ExecutorNotFound(name.to_string()))?;
        Ok((variant.factory)(command, Arc::clone(&self.settings)))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(Settings::default()))
    }
}
