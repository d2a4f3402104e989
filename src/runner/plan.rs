//! Execution planning
//!
//! Turns a validated [`DependencyGraph`] and the tasks requested on the command
//! line into a linear, deduplicated order in which every task comes after all
//! of its dependencies.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::runner::{DependencyGraph, TaskName};

/// One step of an execution plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Task to run
    pub task: TaskName,

    /// Whether the user named this task directly (receives forwarded args)
    pub is_root: bool,
}

/// Ordered tasks for one invocation; each task appears once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    entries: Vec<PlanEntry>,
}

impl ExecutionPlan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter()
    }

    /// Task names in execution order
    pub fn task_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.task.as_str()).collect()
    }

    /// Position of `task` in the plan
    pub fn position(&self, task: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.task == task)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the execution plan for `roots`, in the order they were requested.
///
/// Dependencies are visited depth-first in declared order and placed before
/// the task that needs them. A task already placed is never placed again; if
/// it is requested as a root after being pulled in as a dependency, its
/// existing entry becomes a root entry.
///
/// The graph must already be acyclic, which [`DependencyGraph::build`]
/// guarantees.
pub fn plan<S: AsRef<str>>(graph: &DependencyGraph<'_>, roots: &[S]) -> ResolveResult<ExecutionPlan> {
    if roots.is_empty() {
        return Err(ResolveError::NoTasksRequested);
    }

    let mut root_names = Vec::with_capacity(roots.len());
    for root in roots {
        let root = root.as_ref();
        let record = graph
            .task(root)
            .ok_or_else(|| ResolveError::UnknownTask(root.to_string()))?;
        root_names.push(record.name.as_str());
    }

    let mut entries: Vec<PlanEntry> = Vec::new();
    let mut placed: HashMap<&str, usize> = HashMap::new();

    for root in root_names {
        if let Some(&index) = placed.get(root) {
            entries[index].is_root = true;
            continue;
        }

        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            match graph.dependencies_of(node).get(frame.1) {
                Some(&dep) => {
                    frame.1 += 1;
                    if !placed.contains_key(dep) {
                        stack.push((dep, 0));
                    }
                }
                None => {
                    stack.pop();
                    placed.insert(node, entries.len());
                    entries.push(PlanEntry {
                        task: node.to_string(),
                        is_root: stack.is_empty(),
                    });
                }
            }
        }
    }

    let plan = ExecutionPlan { entries };
    debug!(plan = ?plan.task_names(), "execution plan computed");
    Ok(plan)
}
