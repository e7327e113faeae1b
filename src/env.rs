use std::collections::HashMap;
use std::env as stdenv;
use std::path::{Path, PathBuf};

/// Process environment handed to every command a check spawns.
///
/// The environment contains:
/// - `vars`: environment variables visible to executed commands (and used for `PATH` lookup).
/// - `current_dir`: the working directory commands run in.
///
/// It is captured once per check and only read while commands execute, so
/// commands in one batch cannot change it for the commands that follow.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Same variables as the current process, running in `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            current_dir: dir.as_ref().to_path_buf(),
            ..Self::new()
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
