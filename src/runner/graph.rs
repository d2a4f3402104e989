//! Dependency graph validation
//!
//! Builds the task -> dependency edges of a [`Registry`] and rejects the
//! registry if an edge points at an unknown task or the edges form a cycle.
//! Validation covers every task in the registry, not only the ones requested.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ResolveError, ResolveResult};
use crate::runner::{Registry, TaskRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Validated, read-only view of a registry's dependency edges
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    registry: &'a Registry,
    edges: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build and validate the graph for `registry`.
    pub fn build(registry: &'a Registry) -> ResolveResult<Self> {
        let mut edges = HashMap::with_capacity(registry.len());

        for task in registry.iter() {
            let mut deps: Vec<&str> = Vec::with_capacity(task.dependencies.len());
            for dep in &task.dependencies {
                if !registry.contains(dep) {
                    return Err(ResolveError::UnknownDependency {
                        task: task.name.clone(),
                        missing: dep.clone(),
                    });
                }
                if !deps.contains(&dep.as_str()) {
                    deps.push(dep);
                }
            }
            edges.insert(task.name.as_str(), deps);
        }

        let graph = DependencyGraph { registry, edges };
        graph.check_acyclic()?;

        debug!(tasks = registry.len(), "dependency graph validated");
        Ok(graph)
    }

    /// Look up a task record
    pub fn task(&self, name: &str) -> Option<&'a TaskRecord> {
        self.registry.get(name)
    }

    /// Dependencies of `name` in declared order, without duplicates.
    ///
    /// Unknown names have no dependencies.
    pub fn dependencies_of(&self, name: &str) -> &[&'a str] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Three-color depth-first search over every task.
    ///
    /// Reaching a node that is still in progress means the current DFS path
    /// loops back on itself; that path is reported.
    fn check_acyclic(&self) -> ResolveResult<()> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.edges.len());

        for root in self.registry.names() {
            if marks.contains_key(root) {
                continue;
            }

            marks.insert(root, Mark::InProgress);
            let mut stack: Vec<(&str, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(&dep) = self.dependencies_of(node).get(frame.1) else {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match marks.get(dep) {
                    Some(Mark::Done) => {}
                    Some(Mark::InProgress) => {
                        let start = stack
                            .iter()
                            .position(|(name, _)| *name == dep)
                            .unwrap_or(0);
                        let mut path: Vec<String> =
                            stack[start..].iter().map(|(name, _)| name.to_string()).collect();
                        path.push(dep.to_string());
                        return Err(ResolveError::CyclicDependency(path));
                    }
                    None => {
                        marks.insert(dep, Mark::InProgress);
                        stack.push((dep, 0));
                    }
                }
            }
        }

        Ok(())
    }
}
