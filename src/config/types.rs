//! Core configuration types
//!
//! This module defines the data structures that represent a trun.yml task file
//! as it appears on disk, before validation turns it into a [`Registry`].
//!
//! [`Registry`]: crate::runner::Registry

use serde::de::{Error, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Top-level task file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Interpreter used to run task bodies (e.g., ["bash", "-c"])
    #[serde(default)]
    pub interpreter: Option<Vec<String>>,

    /// Task to run when none is named on the command line
    #[serde(default)]
    pub default: Option<String>,

    /// KEY=VALUE file loaded into every task's environment
    #[serde(default)]
    pub dotenv: Option<PathBuf>,

    /// Environment variables exported to every task
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Task declarations, in the order they appear in the file
    #[serde(default, deserialize_with = "deserialize_task_entries")]
    pub tasks: Vec<TaskEntry>,
}

/// One `name: {...}` declaration under `tasks`, not yet validated.
///
/// The body is kept as a raw YAML value so that a malformed declaration can be
/// reported together with the name of the task it belongs to.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub name: String,
    pub value: Value,
}

/// A single task declaration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Usage description shown by `--list`
    #[serde(default)]
    pub usage: Option<String>,

    /// Tasks that must run before this one
    #[serde(default, deserialize_with = "deserialize_deps")]
    pub deps: Vec<String>,

    /// Shell lines making up the task body
    #[serde(default, deserialize_with = "deserialize_run_lines")]
    pub run: Vec<String>,

    /// Whether the body takes forwarded arguments (inferred when absent)
    #[serde(default)]
    pub args: Option<bool>,

    /// Working directory, relative to the task file
    #[serde(default)]
    pub dir: Option<String>,

    /// Whether this task is private (hidden from listings and completions)
    #[serde(default)]
    pub private: bool,
}

/// Custom deserializer that reads the `tasks` mapping in declaration order.
///
/// Duplicate names are kept; validation reports them with the task name.
fn deserialize_task_entries<'de, D>(deserializer: D) -> Result<Vec<TaskEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<TaskEntry>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of task names to task definitions")
        }

        fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::new();
            while let Some((name, value)) = map.next_entry::<String, Value>()? {
                entries.push(TaskEntry { name, value });
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(EntriesVisitor)
}

/// Custom deserializer for `deps` that handles a single name or a list of names
fn deserialize_deps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(D::Error::custom(format!(
                    "malformed dependency list: expected a task name, found {}",
                    describe(&other)
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(D::Error::custom(format!(
            "malformed dependency list: expected a task name or a list of names, found {}",
            describe(&other)
        ))),
    }
}

/// Custom deserializer for `run` that handles both a single string and a list of lines
fn deserialize_run_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => seq
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(D::Error::custom(format!(
                    "run lines must be strings, found {}",
                    describe(&other)
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(D::Error::custom(format!(
            "run must be a string or a list of strings, found {}",
            describe(&other)
        ))),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_simple_config() {
        let yaml = r#"
tasks:
  hello:
    usage: Say hello
    run: echo "hello"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[0].name, "hello");
    }

    #[test]
    fn test_task_entries_keep_declaration_order() {
        let yaml = r#"
tasks:
  zeta:
    run: "true"
  alpha:
    run: "true"
  mid:
    run: "true"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<&str> = config.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_duplicate_task_names_are_kept_for_validation() {
        let yaml = r#"
tasks:
  build:
    run: "true"
  build:
    run: "false"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tasks.len(), 2);
    }

    #[test]
    fn test_deps_single_string_and_list() {
        let single: Task = serde_yaml::from_str("deps: clean\nrun: make").unwrap();
        assert_eq!(single.deps, vec!["clean"]);

        let list: Task = serde_yaml::from_str("deps: [clean, fetch]\nrun: make").unwrap();
        assert_eq!(list.deps, vec!["clean", "fetch"]);
    }

    #[test]
    fn test_deps_rejects_nested_values() {
        let err = serde_yaml::from_str::<Task>("deps: [[a]]\nrun: make").unwrap_err();
        assert!(err.to_string().contains("malformed dependency list"));

        let err = serde_yaml::from_str::<Task>("deps: {a: b}\nrun: make").unwrap_err();
        assert!(err.to_string().contains("malformed dependency list"));
    }

    #[test]
    fn test_run_lines() {
        let task: Task = serde_yaml::from_str("run:\n  - cd src\n  - ls").unwrap();
        assert_eq!(task.run, vec!["cd src", "ls"]);
    }

    #[test]
    fn test_unknown_task_key_is_rejected() {
        let result = serde_yaml::from_str::<Task>("run: make\ndepends: [a]");
        assert!(result.is_err());
    }

    #[test]
    fn test_global_settings() {
        let yaml = r#"
interpreter: [bash, -c]
default: build
dotenv: .env
env:
  MODE: dev
tasks:
  build:
    run: make
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.interpreter,
            Some(vec!["bash".to_string(), "-c".to_string()])
        );
        assert_eq!(config.default.as_deref(), Some("build"));
        assert_eq!(config.dotenv, Some(PathBuf::from(".env")));
        assert_eq!(config.env.get("MODE").map(String::as_str), Some("dev"));
    }
}
