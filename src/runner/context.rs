//! Execution context for task running
//!
//! The context holds what every task subprocess inherits from the runner: the
//! working directory, the interpreter and the extra environment variables.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::runner::task::DEFAULT_INTERPRETER;
use crate::runner::Registry;

/// Environment variable carrying the running task's name
pub const TASK_ENV_VAR: &str = "TRUN_TASK";

/// Settings shared by every task of one invocation
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory tasks run in (before a task's own `dir`)
    pub working_dir: PathBuf,

    /// Interpreter argv prefix (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,

    /// Variables added on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            interpreter: DEFAULT_INTERPRETER.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    /// Build the context described by a registry's task-file settings.
    ///
    /// Tasks run from the task file's directory. The dotenv file is loaded
    /// first so that the task file's own `env` entries win.
    pub fn from_registry(registry: &Registry) -> ConfigResult<Self> {
        let mut ctx = Context::new().with_interpreter(registry.interpreter().to_vec());

        if let Some(root) = registry.root_dir() {
            ctx = ctx.with_working_dir(root.to_path_buf());
        }

        if let Some(dotenv) = registry.dotenv() {
            let path = ctx.resolve(dotenv);
            for (key, value) in load_dotenv(&path)? {
                ctx.set_var(key, value);
            }
        }

        for (key, value) in registry.env() {
            ctx.set_var(key.clone(), value.clone());
        }

        debug!(
            working_dir = %ctx.working_dir.display(),
            interpreter = ?ctx.interpreter,
            vars = ctx.env.len(),
            "execution context ready"
        );
        Ok(ctx)
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set a single variable
    pub fn set_var(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Resolve a path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Directory a task with the given `dir` setting runs in
    pub fn task_dir(&self, dir: Option<&Path>) -> PathBuf {
        match dir {
            Some(dir) => self.resolve(dir),
            None => self.working_dir.clone(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

fn load_dotenv(path: &Path) -> ConfigResult<Vec<(String, String)>> {
    let dotenv_err = |error: String| ConfigError::Dotenv {
        path: path.to_path_buf(),
        error,
    };

    dotenvy::from_path_iter(path)
        .map_err(|e| dotenv_err(e.to_string()))?
        .map(|item| item.map_err(|e| dotenv_err(e.to_string())))
        .collect()
}
