//! Task records and the registry that owns them
//!
//! This module contains the runtime representation of tasks. A [`Registry`] is
//! built once per invocation from the task file and never changes afterwards.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Name of a task; the registry key
pub type TaskName = String;

/// Interpreter used when the task file does not name one
pub const DEFAULT_INTERPRETER: &[&str] = &["sh", "-c"];

static POSITIONAL_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:[1-9#@*]|\{(?:[1-9][0-9]*|[#@*])\})")
        .expect("positional parameter pattern is valid")
});

/// Whether a shell body references its positional parameters.
pub fn references_arguments(body: &str) -> bool {
    POSITIONAL_PARAM.is_match(body)
}

/// A single validated task declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Task name
    pub name: TaskName,

    /// Usage description
    pub usage: Option<String>,

    /// Dependencies in declaration order (may contain duplicates)
    pub dependencies: Vec<TaskName>,

    /// Opaque shell text handed to the interpreter
    pub body: String,

    /// Whether forwarded arguments may be passed to this task
    pub accepts_args: bool,

    /// Working directory relative to the task file
    pub dir: Option<PathBuf>,

    /// Whether this task is hidden from listings
    pub private: bool,
}

impl TaskRecord {
    /// Create a record, inferring `accepts_args` from the body.
    pub fn new(
        name: impl Into<TaskName>,
        dependencies: impl IntoIterator<Item = impl Into<TaskName>>,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        TaskRecord {
            name: name.into(),
            usage: None,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            accepts_args: references_arguments(&body),
            body,
            dir: None,
            private: false,
        }
    }

    /// Override whether this task accepts forwarded arguments
    pub fn with_accepts_args(mut self, accepts_args: bool) -> Self {
        self.accepts_args = accepts_args;
        self
    }

    /// Set the working directory
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Set the usage line
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Hide this task from listings and completions
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }
}

/// All tasks of one invocation plus the task-file settings the executor needs
#[derive(Debug, Clone)]
pub struct Registry {
    tasks: Vec<TaskRecord>,
    index: HashMap<TaskName, usize>,
    interpreter: Vec<String>,
    env: BTreeMap<String, String>,
    dotenv: Option<PathBuf>,
    default_task: Option<TaskName>,
    root_dir: Option<PathBuf>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry {
            tasks: Vec::new(),
            index: HashMap::new(),
            interpreter: DEFAULT_INTERPRETER.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::new(),
            dotenv: None,
            default_task: None,
            root_dir: None,
        }
    }
}

impl Registry {
    /// Create an empty registry using the default interpreter
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from records, rejecting duplicate names.
    ///
    /// On a duplicate, the offending record is returned.
    pub fn from_records(
        records: impl IntoIterator<Item = TaskRecord>,
    ) -> Result<Self, Box<TaskRecord>> {
        let mut registry = Self::new();
        for record in records {
            registry.insert(record)?;
        }
        Ok(registry)
    }

    /// Add a record; fails if the name is already taken.
    pub fn insert(&mut self, record: TaskRecord) -> Result<(), Box<TaskRecord>> {
        if self.index.contains_key(&record.name) {
            return Err(Box::new(record));
        }
        self.index.insert(record.name.clone(), self.tasks.len());
        self.tasks.push(record);
        Ok(())
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set environment variables exported to every task
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the dotenv file loaded for every task
    pub fn with_dotenv(mut self, path: PathBuf) -> Self {
        self.dotenv = Some(path);
        self
    }

    /// Set the default task
    pub fn with_default_task(mut self, name: TaskName) -> Self {
        self.default_task = Some(name);
        self
    }

    /// Set the directory the task file lives in
    pub fn with_root_dir(mut self, dir: PathBuf) -> Self {
        self.root_dir = Some(dir);
        self
    }

    /// Look up a task
    pub fn get(&self, name: &str) -> Option<&TaskRecord> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    /// Whether a task exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate tasks in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &TaskRecord> {
        self.tasks.iter()
    }

    /// Task names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    /// Public (non-private) task names in declaration order
    pub fn public_names(&self) -> impl Iterator<Item = &str> {
        self.tasks
            .iter()
            .filter(|t| !t.private)
            .map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn interpreter(&self) -> &[String] {
        &self.interpreter
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn dotenv(&self) -> Option<&Path> {
        self.dotenv.as_deref()
    }

    pub fn default_task(&self) -> Option<&str> {
        self.default_task.as_deref()
    }

    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }
}
