//! Resolver configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, a
//! JSON config file, and `MODSOLVE_*` environment variables.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};
use crate::metadata::Environment;

/// Default cap on solver decisions plus conflicts.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100_000;
/// Default cap on re-solves while building diagnostics.
pub const DEFAULT_MAX_RELAXATION_ATTEMPTS: u32 = 2_000;
pub const DEFAULT_SCAN_THREADS: usize = 4;

/// Knobs for a resolution run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ResolverConfig {
    /// Environment candidates are checked against.
    pub environment: Environment,
    /// Solver gives up after this many decisions and conflicts.
    pub max_iterations: u32,
    /// Diagnostics fall back to a plain listing after this many re-solves.
    pub max_relaxation_attempts: u32,
    /// Dependency override file.
    pub overrides: Option<PathBuf>,
    /// Log the describable path of every candidate, for writing overrides.
    pub dump_override_paths: bool,
    /// Worker threads per discovery pass.
    pub scan_threads: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Client,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_relaxation_attempts: DEFAULT_MAX_RELAXATION_ATTEMPTS,
            overrides: None,
            dump_override_paths: false,
            scan_threads: DEFAULT_SCAN_THREADS,
        }
    }
}

impl ResolverConfig {
    /// Defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        ConfigLoader::new(true).load(path)
    }
}

/// Builds a [`ResolverConfig`] from its layers.
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
    /// Replaces the process environment when set.
    vars: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self {
            use_environment,
            vars: None,
        }
    }

    /// Loader that reads variables from `vars` instead of the process environment.
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self {
            use_environment: true,
            vars: Some(vars),
        }
    }

    /// Get a MODSOLVE_* environment variable
    pub fn get_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        let value = match &self.vars {
            Some(vars) => vars.get(var).cloned(),
            None => env::var(var).ok(),
        };
        value.filter(|s| !s.is_empty())
    }

    /// Load configuration from a JSON file
    pub fn load_config_file(&self, path: &Path) -> Result<ResolverConfig> {
        if !path.exists() {
            return Ok(ResolverConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ResolveError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| ResolveError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn load(&self, path: Option<&Path>) -> Result<ResolverConfig> {
        let mut config = match path {
            Some(path) => self.load_config_file(path)?,
            None => ResolverConfig::default(),
        };
        self.apply_environment(&mut config)?;
        Ok(config)
    }

    fn apply_environment(&self, config: &mut ResolverConfig) -> Result<()> {
        if let Some(value) = self.get_env("MODSOLVE_ENVIRONMENT") {
            config.environment = value
                .parse()
                .map_err(|e| ResolveError::Config(format!("MODSOLVE_ENVIRONMENT: {}", e)))?;
        }
        if let Some(value) = self.get_env("MODSOLVE_MAX_ITERATIONS") {
            config.max_iterations = parse_number("MODSOLVE_MAX_ITERATIONS", &value)?;
        }
        if let Some(value) = self.get_env("MODSOLVE_MAX_RELAXATION_ATTEMPTS") {
            config.max_relaxation_attempts = parse_number("MODSOLVE_MAX_RELAXATION_ATTEMPTS", &value)?;
        }
        if let Some(value) = self.get_env("MODSOLVE_OVERRIDES") {
            config.overrides = Some(PathBuf::from(value));
        }
        if let Some(value) = self.get_env("MODSOLVE_DUMP_OVERRIDE_PATHS") {
            config.dump_override_paths = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(value) = self.get_env("MODSOLVE_SCAN_THREADS") {
            config.scan_threads = parse_number::<usize>("MODSOLVE_SCAN_THREADS", &value)?.max(1);
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ResolveError::Config(format!("{} must be a number, got '{}'", var, value)))
}
