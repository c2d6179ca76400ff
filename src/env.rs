use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

use crate::command::ExitCode;

/// Execution context handed explicitly from the console to every task and command.
///
/// The environment contains:
/// - `vars`: shell variables, seeded from the process environment.
/// - `current_dir`: the working directory commands resolve relative paths against.
/// - `should_exit`: set by `exit`; the shell task reports it back to the console loop.
/// - `last_status`: exit code of the most recent command line.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
    pub last_status: ExitCode,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: stdenv::vars().collect(),
            current_dir,
            should_exit: false,
            last_status: 0,
        }
    }

    /// An environment with no variables, rooted at `current_dir`.
    pub fn empty(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
            should_exit: false,
            last_status: 0,
        }
    }

    /// Get the value of a shell variable.
    ///
    /// Unlike the process environment, an unset variable here is simply absent.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override a shell variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Variables ordered by name, for listing.
    pub fn sorted_vars(&self) -> Vec<(&str, &str)> {
        let mut vars: Vec<(&str, &str)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        vars.sort_unstable();
        vars
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
