//! Task file validation
//!
//! Checks each declaration of a parsed task file and builds the [`Registry`].
//! Every problem is reported as [`ConfigError::MalformedDefinition`] naming the
//! declaration it was found in.

use serde_yaml::Value;

use crate::config::types::{Config, Task, TaskEntry};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::{Registry, TaskRecord};

/// Name used in errors about file-level settings
const FILE_SCOPE: &str = "<task file>";

/// Validate a complete task file and build its registry
pub fn build_registry(config: Config) -> ConfigResult<Registry> {
    let mut registry = Registry::new();

    for entry in config.tasks {
        let record = validate_task(entry)?;
        registry
            .insert(record)
            .map_err(|dup| ConfigError::malformed(dup.name, "duplicate task name"))?;
    }

    if let Some(interpreter) = config.interpreter {
        if interpreter.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(ConfigError::malformed(
                FILE_SCOPE,
                "interpreter must name a program",
            ));
        }
        registry = registry.with_interpreter(interpreter);
    }

    if let Some(default) = config.default {
        if !registry.contains(&default) {
            return Err(ConfigError::malformed(
                default,
                "default task is not defined",
            ));
        }
        registry = registry.with_default_task(default);
    }

    if let Some(dotenv) = config.dotenv {
        registry = registry.with_dotenv(dotenv);
    }

    Ok(registry.with_env(config.env))
}

/// Validate a single declaration
pub fn validate_task(entry: TaskEntry) -> ConfigResult<TaskRecord> {
    let TaskEntry { name, value } = entry;

    validate_task_name(&name)?;

    let task: Task = match value {
        Value::Null => Task::default(),
        value => serde_yaml::from_value(value)
            .map_err(|e| ConfigError::malformed(name.clone(), e.to_string()))?,
    };

    if let Some(dep) = task.deps.iter().find(|d| d.trim().is_empty()) {
        return Err(ConfigError::malformed(
            name,
            format!("malformed dependency list: empty task name {:?}", dep),
        ));
    }

    let body = task.run.join("\n");
    if body.trim().is_empty() {
        return Err(ConfigError::malformed(name, "missing body"));
    }

    // `new` infers argument support from the body; an explicit `args` wins
    let mut record = TaskRecord::new(name, task.deps, body);
    if let Some(accepts_args) = task.args {
        record = record.with_accepts_args(accepts_args);
    }
    if let Some(usage) = task.usage {
        record = record.with_usage(usage);
    }
    if let Some(dir) = task.dir {
        record = record.with_dir(dir);
    }
    if task.private {
        record = record.private();
    }

    Ok(record)
}

/// Task names must be usable as command-line words.
fn validate_task_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::malformed(name, "task name must not be empty"));
    }
    if name.starts_with('-') {
        return Err(ConfigError::malformed(name, "task name must not start with '-'"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ConfigError::malformed(
            name,
            "task name must not contain whitespace",
        ));
    }
    Ok(())
}
