//! Loading a check run's whitelist and executor settings from TOML.
//!
//! ```toml
//! [executor]
//! mode = "process"
//! timeout_secs = 10
//! working_dir = "lesson"
//!
//! [policy]
//! ls = ["-l", "-a"]
//! echo = []
//! ```
//!
//! A missing `[policy]` table means the built-in policy; a missing
//! `[executor]` table means real processes, no timeout, current directory.

use crate::builtin::SimulatedExecutor;
use crate::checker::Checker;
use crate::command::Executor;
use crate::env::Environment;
use crate::external::ProcessExecutor;
use crate::policy::WhitelistPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors that can occur while loading or validating a check configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid config: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// How admitted commands are run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorMode {
    /// Spawn real child processes.
    #[default]
    Process,
    /// Answer a handful of commands in-process; nothing is spawned.
    Simulated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub mode: ExecutorMode,

    /// Kill a command after this many seconds. Unbounded when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Directory commands run in. Defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

/// Top-level configuration of a check run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<WhitelistPolicy>,
}

impl CheckConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: CheckConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();
        if self.executor.timeout_secs == Some(0) {
            reasons.push("executor.timeout_secs must be greater than zero".to_string());
        }
        if let Some(policy) = &self.policy {
            for name in policy.command_names() {
                if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
                    reasons.push(format!("policy command name {name:?} is not a single word"));
                }
            }
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(reasons))
        }
    }

    /// The configured policy, or the built-in one.
    pub fn policy(&self) -> WhitelistPolicy {
        self.policy.clone().unwrap_or_default()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.executor.timeout_secs.map(Duration::from_secs)
    }

    pub fn environment(&self) -> Environment {
        match &self.executor.working_dir {
            Some(dir) => Environment::in_dir(dir),
            None => Environment::new(),
        }
    }

    pub fn executor(&self) -> Box<dyn Executor> {
        let env = self.environment();
        match self.executor.mode {
            ExecutorMode::Process => {
                let exec = ProcessExecutor::new(env);
                match self.timeout() {
                    Some(limit) => Box::new(exec.with_timeout(limit)),
                    None => Box::new(exec),
                }
            }
            ExecutorMode::Simulated => Box::new(SimulatedExecutor::new(env)),
        }
    }

    /// Build a [`Checker`] from this configuration.
    pub fn checker(&self) -> Checker {
        Checker::new(self.policy(), self.executor())
    }
}
