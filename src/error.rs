//! Error types for trun

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::runner::TaskName;

/// Result type alias for trun operations
pub type Result<T> = std::result::Result<T, TrunError>;

/// Exit code reported for an interrupted run (128 + SIGINT)
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Main error type for trun
#[derive(Error, Debug)]
pub enum TrunError {
    /// Task file discovery and parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Dependency resolution errors
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Flat classification of everything that can stop an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedDefinition,
    UnknownDependency,
    UnknownTask,
    CyclicDependency,
    TaskExecutionFailure,
    Interrupted,
    Io,
    Usage,
}

impl TrunError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrunError::Config(ConfigError::MalformedDefinition { .. })
            | TrunError::Config(ConfigError::Yaml(_)) => ErrorKind::MalformedDefinition,
            TrunError::Config(ConfigError::NotFound(_)) => ErrorKind::Usage,
            TrunError::Config(_) => ErrorKind::Io,
            TrunError::Resolve(ResolveError::UnknownDependency { .. }) => {
                ErrorKind::UnknownDependency
            }
            TrunError::Resolve(ResolveError::UnknownTask(_)) => ErrorKind::UnknownTask,
            TrunError::Resolve(ResolveError::CyclicDependency(_)) => ErrorKind::CyclicDependency,
            TrunError::Resolve(ResolveError::NoTasksRequested) => ErrorKind::Usage,
            TrunError::Execution(ExecutionError::Interrupted(_)) => ErrorKind::Interrupted,
            TrunError::Execution(ExecutionError::ArgumentsNotAccepted(_)) => ErrorKind::Usage,
            TrunError::Execution(ExecutionError::NotInRegistry(_)) => ErrorKind::UnknownTask,
            TrunError::Execution(ExecutionError::Runtime(_)) => ErrorKind::Io,
            TrunError::Execution(_) => ErrorKind::TaskExecutionFailure,
            TrunError::Io(_) => ErrorKind::Io,
        }
    }

    /// Process exit code the CLI should report for this error.
    ///
    /// A failing task's own exit status is passed through unchanged so that
    /// shell scripts wrapping the runner see what the task returned.
    pub fn exit_code(&self) -> i32 {
        match (self.kind(), self) {
            (ErrorKind::Interrupted, _) => INTERRUPTED_EXIT_CODE,
            (
                ErrorKind::TaskExecutionFailure,
                TrunError::Execution(ExecutionError::TaskFailed { code, .. }),
            ) => *code,
            _ => 1,
        }
    }
}

/// Task file discovery and parsing errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find task file (searched: {0})")]
    NotFound(String),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Malformed definition of task '{task}': {reason}")]
    MalformedDefinition { task: String, reason: String },

    #[error("Failed to load dotenv file '{path}': {error}")]
    Dotenv { path: PathBuf, error: String },
}

impl ConfigError {
    pub(crate) fn malformed(task: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::MalformedDefinition {
            task: task.into(),
            reason: reason.into(),
        }
    }
}

/// Dependency graph and planning errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Task '{task}' depends on '{missing}', which is not defined")]
    UnknownDependency { task: TaskName, missing: TaskName },

    #[error("Task '{0}' is not defined")]
    UnknownTask(TaskName),

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CyclicDependency(Vec<TaskName>),

    #[error("No task requested and no default task defined")]
    NoTasksRequested,
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Task '{task}' failed with exit code {code}")]
    TaskFailed { task: TaskName, code: i32 },

    #[error("Failed to start task '{task}': {source}")]
    Spawn {
        task: TaskName,
        #[source]
        source: io::Error,
    },

    #[error("Task '{0}' was interrupted")]
    Interrupted(TaskName),

    #[error("Task '{0}' does not accept arguments")]
    ArgumentsNotAccepted(TaskName),

    #[error("Planned task '{0}' is not in the registry")]
    NotInRegistry(TaskName),

    #[error("Failed to start process runtime: {0}")]
    Runtime(io::Error),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for resolution operations
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
