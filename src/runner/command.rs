//! Command execution
//!
//! This module spawns task bodies as shell subprocesses. Output is inherited,
//! not captured, so progress printed by a task shows up immediately.

use std::ffi::OsStr;
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, warn};

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::context::TASK_ENV_VAR;
use crate::runner::task::DEFAULT_INTERPRETER;
use crate::runner::{Context, TaskRecord};

/// How long an interrupted task gets to exit on its own before it is killed
pub const DEFAULT_INTERRUPT_GRACE: Duration = Duration::from_secs(2);

/// How a single task subprocess ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(i32),
    Interrupted,
}

/// Runs one task to completion.
///
/// [`ShellBackend`] is the real implementation; tests substitute their own to
/// observe which tasks ran and with which arguments.
pub trait TaskBackend {
    fn run_task(
        &mut self,
        task: &TaskRecord,
        args: &[String],
        ctx: &Context,
    ) -> ExecutionResult<TaskOutcome>;
}

/// Build the subprocess for a task.
///
/// The body is passed to the interpreter followed by the task name (which the
/// shell exposes as `$0`) and the forwarded arguments (`$1`, `$2`, ...).
pub fn build_command(task: &TaskRecord, args: &[String], ctx: &Context) -> StdCommand {
    let (program, prefix): (&str, Vec<&str>) = match ctx.interpreter.split_first() {
        Some((program, rest)) => (program.as_str(), rest.iter().map(String::as_str).collect()),
        None => (DEFAULT_INTERPRETER[0], DEFAULT_INTERPRETER[1..].to_vec()),
    };

    let mut command = StdCommand::new(program);
    command
        .args(prefix)
        .arg(&task.body)
        .arg(&task.name)
        .args(args)
        .current_dir(ctx.task_dir(task.dir.as_deref()))
        .envs(&ctx.env)
        .env(TASK_ENV_VAR, &task.name)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    command
}

/// Exit code to report for a finished process.
///
/// Processes killed by a signal report `128 + signal`, as shells do.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// A signal asking the whole run to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Interrupt,
    Terminate,
}

impl StopSignal {
    /// Signal name as accepted by `kill -s`
    pub fn name(self) -> &'static str {
        match self {
            StopSignal::Interrupt => "INT",
            StopSignal::Terminate => "TERM",
        }
    }
}

/// Listeners for SIGINT and SIGTERM, registered once per run.
///
/// Once registered, these signals no longer terminate trun itself; the
/// backend decides what happens to the running task.
struct StopSignals {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl StopSignals {
    #[cfg(unix)]
    fn register() -> std::io::Result<Self> {
        Ok(StopSignals {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    fn register() -> std::io::Result<Self> {
        Ok(StopSignals {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> StopSignal {
        tokio::select! {
            biased;
            Some(()) = self.interrupt.recv() => StopSignal::Interrupt,
            Some(()) = self.terminate.recv() => StopSignal::Terminate,
            else => std::future::pending().await,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> StopSignal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => StopSignal::Interrupt,
            Err(_) => std::future::pending().await,
        }
    }

    /// A signal that arrived while no task was running, if any.
    async fn pending(&mut self) -> Option<StopSignal> {
        // gives the driver a turn so signals raised since the last task are delivered
        tokio::task::yield_now().await;
        tokio::select! {
            biased;
            signal = self.recv() => Some(signal),
            _ = std::future::ready(()) => None,
        }
    }
}

/// Runs tasks through the configured shell, one at a time.
///
/// SIGINT and SIGTERM are caught for the whole run. A signal that arrives
/// while a task runs is forwarded to the task's process, which then gets a
/// grace period before it is killed. A signal that arrives between tasks stops
/// the run before the next task starts. Either way the task is reported as
/// interrupted.
pub struct ShellBackend {
    runtime: Runtime,
    signals: StopSignals,
    grace: Duration,
}

impl ShellBackend {
    pub fn new() -> ExecutionResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ExecutionError::Runtime)?;

        let signals = {
            let _guard = runtime.enter();
            StopSignals::register().map_err(ExecutionError::Runtime)?
        };

        Ok(ShellBackend {
            runtime,
            signals,
            grace: DEFAULT_INTERRUPT_GRACE,
        })
    }
}

impl TaskBackend for ShellBackend {
    fn run_task(
        &mut self,
        task: &TaskRecord,
        args: &[String],
        ctx: &Context,
    ) -> ExecutionResult<TaskOutcome> {
        if let Some(signal) = self.runtime.block_on(self.signals.pending()) {
            warn!(task = %task.name, signal = signal.name(), "stop requested; not starting task");
            return Ok(TaskOutcome::Interrupted);
        }

        let std_command = build_command(task, args, ctx);
        debug!(
            task = %task.name,
            program = ?std_command.get_program(),
            args = ?std_command.get_args().collect::<Vec<&OsStr>>(),
            dir = ?std_command.get_current_dir(),
            "spawning task process"
        );

        let mut command = tokio::process::Command::from(std_command);
        command.kill_on_drop(true);

        self.runtime.block_on(wait_for_task(
            &task.name,
            command,
            &mut self.signals,
            self.grace,
        ))
    }
}

async fn wait_for_task(
    name: &str,
    mut command: tokio::process::Command,
    signals: &mut StopSignals,
    grace: Duration,
) -> ExecutionResult<TaskOutcome> {
    let spawn_err = |source| ExecutionError::Spawn {
        task: name.to_string(),
        source,
    };

    let mut child = command.spawn().map_err(spawn_err)?;

    // a signal racing the child's exit still stops the run
    let signal = tokio::select! {
        biased;
        signal = signals.recv() => signal,
        status = child.wait() => return Ok(outcome_of(status.map_err(spawn_err)?)),
    };

    warn!(task = %name, signal = signal.name(), "stop requested; waiting for task to exit");
    forward_signal(name, child.id(), signal).await;

    if tokio::time::timeout(grace, child.wait()).await.is_err() {
        warn!(task = %name, "task still running; killing it");
        if let Err(e) = child.kill().await {
            warn!(task = %name, error = %e, "failed to kill task process");
        }
    }
    Ok(TaskOutcome::Interrupted)
}

/// Send `signal` to the task process through the shell's `kill` builtin.
#[cfg(unix)]
async fn forward_signal(name: &str, pid: Option<u32>, signal: StopSignal) {
    let Some(pid) = pid else {
        return;
    };

    let sent = tokio::process::Command::new("sh")
        .args(["-c", "kill -s \"$1\" \"$2\"", "trun-kill", signal.name()])
        .arg(pid.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match sent {
        Ok(status) if status.success() => {
            debug!(task = %name, pid, signal = signal.name(), "forwarded signal to task")
        }
        // the task may already have exited
        Ok(status) => debug!(task = %name, pid, ?status, "kill did not succeed"),
        Err(e) => warn!(task = %name, error = %e, "failed to forward signal to task"),
    }
}

#[cfg(not(unix))]
async fn forward_signal(_name: &str, _pid: Option<u32>, _signal: StopSignal) {}

fn outcome_of(status: ExitStatus) -> TaskOutcome {
    if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(exit_code(status))
    }
}
