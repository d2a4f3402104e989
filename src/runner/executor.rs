//! Plan execution
//!
//! Runs an [`ExecutionPlan`] strictly in order, one task at a time, and stops
//! at the first task that does not succeed. Forwarded arguments only reach the
//! tasks the user asked for by name.

use std::time::Instant;

use tracing::{error, info, warn};

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{Context, ExecutionPlan, Registry, TaskBackend, TaskName, TaskOutcome};

/// Final state of one planned task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Succeeded,
    Failed(i32),
    Interrupted,
    NotRun,
}

/// Per-task results of one plan execution
#[derive(Debug)]
pub struct ExecutionReport {
    results: Vec<(TaskName, TaskStatus)>,
    error: Option<ExecutionError>,
}

impl ExecutionReport {
    fn not_run(plan: &ExecutionPlan) -> Self {
        ExecutionReport {
            results: plan
                .iter()
                .map(|e| (e.task.clone(), TaskStatus::NotRun))
                .collect(),
            error: None,
        }
    }

    /// Status of a single task
    pub fn status_of(&self, task: &str) -> Option<TaskStatus> {
        self.results
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, status)| *status)
    }

    /// Tasks that were started, in order
    pub fn started(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, status)| *status != TaskStatus::NotRun)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The error that stopped execution, if any
    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into the invocation's overall result
    pub fn into_result(self) -> ExecutionResult<()> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Sequential plan runner
pub struct Executor<'a, B: TaskBackend> {
    registry: &'a Registry,
    ctx: Context,
    backend: B,
}

impl<'a, B: TaskBackend> Executor<'a, B> {
    pub fn new(registry: &'a Registry, ctx: Context, backend: B) -> Self {
        Executor {
            registry,
            ctx,
            backend,
        }
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Run every task of `plan` in order.
    ///
    /// Root entries receive `args`; every other entry runs without arguments.
    /// The first task that fails, cannot be started, or is interrupted stops
    /// the run and leaves the remaining tasks [`TaskStatus::NotRun`].
    pub fn execute(&mut self, plan: &ExecutionPlan, args: &[String]) -> ExecutionReport {
        let mut report = ExecutionReport::not_run(plan);

        if let Err(err) = self.check_arguments(plan, args) {
            error!(error = %err, "refusing to run plan");
            report.error = Some(err);
            return report;
        }

        for (index, entry) in plan.iter().enumerate() {
            let Some(task) = self.registry.get(&entry.task) else {
                report.error = Some(ExecutionError::NotInRegistry(entry.task.clone()));
                break;
            };

            let task_args: &[String] = if entry.is_root { args } else { &[] };

            info!(task = %task.name, "Starting '{}'", task.name);
            let started = Instant::now();
            let outcome = self.backend.run_task(task, task_args, &self.ctx);
            let elapsed = started.elapsed().as_secs_f64();

            let (status, err) = match outcome {
                Ok(TaskOutcome::Success) => {
                    info!(task = %task.name, "Finished '{}' after {:.2}s", task.name, elapsed);
                    (TaskStatus::Succeeded, None)
                }
                Ok(TaskOutcome::Failed(code)) => {
                    error!(
                        task = %task.name,
                        exit_code = code,
                        "'{}' failed with exit code {} after {:.2}s",
                        task.name,
                        code,
                        elapsed
                    );
                    let err = ExecutionError::TaskFailed {
                        task: task.name.clone(),
                        code,
                    };
                    (TaskStatus::Failed(code), Some(err))
                }
                Ok(TaskOutcome::Interrupted) => {
                    warn!(task = %task.name, "'{}' interrupted", task.name);
                    let err = ExecutionError::Interrupted(task.name.clone());
                    (TaskStatus::Interrupted, Some(err))
                }
                Err(err) => {
                    error!(task = %task.name, error = %err, "'{}' could not be started", task.name);
                    (TaskStatus::Failed(1), Some(err))
                }
            };

            report.results[index].1 = status;
            if err.is_some() {
                report.error = err;
                break;
            }
        }

        report
    }

    /// Forwarded arguments must be accepted by every root that receives them.
    fn check_arguments(&self, plan: &ExecutionPlan, args: &[String]) -> ExecutionResult<()> {
        if args.is_empty() {
            return Ok(());
        }

        for entry in plan.iter().filter(|e| e.is_root) {
            if let Some(task) = self.registry.get(&entry.task) {
                if !task.accepts_args {
                    return Err(ExecutionError::ArgumentsNotAccepted(task.name.clone()));
                }
            }
        }

        Ok(())
    }
}
