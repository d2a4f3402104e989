//! Main CLI application

use crate::config::{find_config_file, parse_config_auto, parse_config_file};
use crate::error::Result as TrunResult;
use crate::logging::{init_logging, parse_level_str, LOG_LEVELS};
use crate::runner::{plan, Context, DependencyGraph, ExecutionPlan, Executor, Registry, ShellBackend};
use anyhow::{anyhow, Result};
use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::*;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use tracing::{debug, Level};

/// Build the clap command.
///
/// `task_names` become the possible values of `TASK`; they are only supplied
/// when generating completion scripts so that private tasks stay runnable.
pub fn build_cli(task_names: &[String]) -> Command {
    let mut tasks_arg = Arg::new("tasks")
        .value_name("TASK")
        .help("Tasks to run (defaults to the task file's `default`)")
        .num_args(0..)
        .action(ArgAction::Append);

    if !task_names.is_empty() {
        tasks_arg = tasks_arg.value_parser(PossibleValuesParser::new(task_names.to_vec()));
    }

    Command::new("trun")
        .version(crate::VERSION)
        .about("A lightweight YAML task runner")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to the task file (skips discovery)"),
        )
        .arg(
            Arg::new("directory")
                .short('C')
                .long("directory")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Change to DIR before doing anything"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List public tasks with their usage and dependencies")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the execution plan without running it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a completion script for SHELL"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print warnings and errors from the runner")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Only print errors from the runner")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print debug output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(PossibleValuesParser::new(LOG_LEVELS.iter().copied()))
                .help("Explicit log level"),
        )
        .arg(tasks_arg)
        .arg(
            Arg::new("args")
                .value_name("ARGS")
                .help("Arguments forwarded to the requested tasks")
                .num_args(0..)
                .last(true)
                .allow_hyphen_values(true),
        )
}

/// Get the log level requested on the command line, if any
fn get_log_level(matches: &ArgMatches) -> Option<Level> {
    if let Some(level) = matches.get_one::<String>("log-level") {
        return parse_level_str(level);
    }

    if matches.get_flag("silent") {
        Some(Level::ERROR)
    } else if matches.get_flag("quiet") {
        Some(Level::WARN)
    } else if matches.get_flag("verbose") {
        Some(Level::DEBUG)
    } else {
        None
    }
}

fn collect_values(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<()> {
    run_from(std::env::args_os())
}

/// Run the CLI application with provided arguments
pub fn run_from<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli(&[]).get_matches_from(args);

    init_logging(get_log_level(&matches))?;

    if let Some(dir) = matches.get_one::<PathBuf>("directory") {
        std::env::set_current_dir(dir)
            .map_err(|e| anyhow!("cannot change to directory '{}': {}", dir.display(), e))?;
    }

    if let Some(shell) = matches.get_one::<Shell>("completions") {
        print_completions(*shell, matches.get_one::<PathBuf>("file"));
        return Ok(());
    }

    execute(&matches)?;
    Ok(())
}

/// Load the registry, plan the requested tasks and run them
fn execute(matches: &ArgMatches) -> TrunResult<()> {
    let registry = load_registry(matches.get_one::<PathBuf>("file"))?;

    if matches.get_flag("list") {
        print_task_list(&registry);
        return Ok(());
    }

    let mut tasks = collect_values(matches, "tasks");
    let args = collect_values(matches, "args");

    if tasks.is_empty() {
        match registry.default_task() {
            Some(default) => tasks.push(default.to_string()),
            None => {
                print_task_list(&registry);
                return Ok(());
            }
        }
    }

    let graph = DependencyGraph::build(&registry)?;
    let plan = plan(&graph, &tasks)?;
    debug!(plan = ?plan.task_names(), args = ?args, "execution plan ready");

    if matches.get_flag("dry-run") {
        print_plan(&plan, &args);
        return Ok(());
    }

    let ctx = Context::from_registry(&registry)?;
    let backend = ShellBackend::new()?;
    let mut executor = Executor::new(&registry, ctx, backend);
    let report = executor.execute(&plan, &args);
    debug!(started = ?report.started(), "run finished");
    report.into_result()?;

    Ok(())
}

fn load_registry(file: Option<&PathBuf>) -> TrunResult<Registry> {
    let registry = match file {
        Some(path) => parse_config_file(path)?,
        None => parse_config_auto()?.0,
    };
    Ok(registry)
}

/// Print a completion script, offering the public task names when a task
/// file can be found.
fn print_completions(shell: Shell, file: Option<&PathBuf>) {
    let path = match file {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };

    let task_names: Vec<String> = path
        .and_then(|p| parse_config_file(&p).ok())
        .map(|registry| registry.public_names().map(str::to_string).collect())
        .unwrap_or_default();

    let mut cmd = build_cli(&task_names);
    clap_complete::generate(shell, &mut cmd, "trun", &mut io::stdout());
}

/// Print the public tasks with their usage and dependencies
pub fn print_task_list(registry: &Registry) {
    println!("{}", "Available tasks".bold().underline());

    let tasks: Vec<_> = registry.iter().filter(|t| !t.private).collect();
    if tasks.is_empty() {
        println!("  {}", "No tasks defined".dimmed());
        return;
    }

    let width = tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);

    for task in tasks {
        let mut line = format!("  {}", format!("{:width$}", task.name).cyan().bold());

        if let Some(usage) = &task.usage {
            line.push_str(&format!("  {}", usage));
        }
        if !task.dependencies.is_empty() {
            let deps = format!("[deps: {}]", task.dependencies.join(", "));
            line.push_str(&format!("  {}", deps.dimmed()));
        }
        if registry.default_task() == Some(task.name.as_str()) {
            line.push_str(&format!("  {}", "(default)".green()));
        }

        println!("{}", line.trim_end());
    }
}

/// Print the execution order without running anything
pub fn print_plan(plan: &ExecutionPlan, args: &[String]) {
    println!("{}:", "Execution order".bold());

    for (i, entry) in plan.iter().enumerate() {
        if entry.is_root && !args.is_empty() {
            println!(
                "  {}. {} {}",
                i + 1,
                entry.task.cyan(),
                args.join(" ").dimmed()
            );
        } else if entry.is_root {
            println!("  {}. {}", i + 1, entry.task.cyan());
        } else {
            println!("  {}. {}", i + 1, entry.task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[&str]) -> ArgMatches {
        build_cli(&[]).try_get_matches_from(args).unwrap()
    }

    #[test]
    fn test_tasks_and_forwarded_args() {
        let m = matches(&["trun", "build", "deploy", "--", "--env=prod", "-x"]);
        assert_eq!(collect_values(&m, "tasks"), vec!["build", "deploy"]);
        assert_eq!(collect_values(&m, "args"), vec!["--env=prod", "-x"]);
    }

    #[test]
    fn test_no_tasks() {
        let m = matches(&["trun"]);
        assert!(collect_values(&m, "tasks").is_empty());
        assert!(collect_values(&m, "args").is_empty());
    }

    #[test]
    fn test_file_flag() {
        let m = matches(&["trun", "-f", "other.yml", "build"]);
        assert_eq!(
            m.get_one::<PathBuf>("file"),
            Some(&PathBuf::from("other.yml"))
        );
    }

    #[test]
    fn test_get_log_level_default() {
        assert_eq!(get_log_level(&matches(&["trun"])), None);
    }

    #[test]
    fn test_get_log_level_flags() {
        assert_eq!(get_log_level(&matches(&["trun", "-v"])), Some(Level::DEBUG));
        assert_eq!(get_log_level(&matches(&["trun", "-q"])), Some(Level::WARN));
        assert_eq!(get_log_level(&matches(&["trun", "-s", "-v"])), Some(Level::ERROR));
    }

    #[test]
    fn test_explicit_log_level_wins() {
        let m = matches(&["trun", "-q", "--log-level", "trace"]);
        assert_eq!(get_log_level(&m), Some(Level::TRACE));
    }

    #[test]
    fn test_completion_values_restrict_tasks() {
        let names = vec!["build".to_string(), "test".to_string()];
        assert!(build_cli(&names)
            .try_get_matches_from(["trun", "build"])
            .is_ok());
        assert!(build_cli(&names)
            .try_get_matches_from(["trun", "nope"])
            .is_err());
    }

    #[test]
    fn test_cli_is_well_formed() {
        build_cli(&["a".to_string()]).debug_assert();
    }
}
