//! Main CLI application
//!
//! The binary is a thin driver: it owns the registry handed in by `main`,
//! loads the project configuration, and surfaces the scheduler's verdict.
//! A failed platform prints the failing task, its rendered command, and
//! the captured output verbatim, then exits non-zero.

use crate::config::{parse_config_auto, parse_config_file, validate_project, Project};
use crate::error::{ConfigError, ExecutionError, ForgeError};
use crate::runner::{Outcome, Platform, PlatformReport, Registry, RunRequest, Scheduler, TaskKind};
use crate::ui::{Ui, Verbosity};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::str::FromStr;

/// Run the CLI with the given task registry
pub fn run(registry: Registry) -> Result<(), ForgeError> {
    // Environment overrides from .env, if present
    dotenvy::dotenv().ok();

    let matches = build_command().get_matches();
    let verbosity = get_verbosity(&matches);
    let ui = Ui::new(verbosity);

    if matches.get_flag("list") {
        print_task_list(&registry);
        return Ok(());
    }

    let (config, config_path) = match matches.get_one::<String>("file") {
        Some(path) => {
            let path = PathBuf::from(path);
            (parse_config_file(&path)?, path)
        }
        None => parse_config_auto()?,
    };
    let project = Project::new(config, &config_path);
    validate_project(&project)?;

    let mut request = RunRequest::new(resolve_platforms(&matches, &project)?);
    request.kinds = resolve_kinds(&matches)?;
    request.tasks = matches
        .get_many::<String>("task")
        .map(|values| values.cloned().collect());
    request.serial = matches.get_flag("serial");

    let scheduler = Scheduler::new(&project, &registry, ui);
    let reports = scheduler.run(&request)?;

    summarize(&reports, ui)
}

/// Build the clap command
fn build_command() -> Command {
    Command::new("crossforge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A build-task engine for cross-compiling runtime distributions")
        .arg(
            Arg::new("platform")
                .value_name("PLATFORM")
                .num_args(0..)
                .help("Platforms to build (default: all configured)"),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to crossforge.yml config file"),
        )
        .arg(
            Arg::new("kind")
                .short('k')
                .long("kind")
                .value_name("KIND")
                .action(ArgAction::Append)
                .help("Only run tasks of this kind (python, host-python, cross)"),
        )
        .arg(
            Arg::new("task")
                .short('t')
                .long("task")
                .value_name("TASK")
                .action(ArgAction::Append)
                .help("Only run tasks with this name"),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List registered tasks and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .help("Run platform sequences one at a time")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Requested platforms, defaulting to everything the config declares
fn resolve_platforms(matches: &ArgMatches, project: &Project) -> Result<Vec<Platform>, ForgeError> {
    let mut platforms = match matches.get_many::<String>("platform") {
        Some(values) => {
            let mut platforms = Vec::new();
            for value in values {
                platforms.push(Platform::from_str(value)?);
            }
            platforms
        }
        None => project.configured_platforms(),
    };

    platforms.dedup();
    if platforms.is_empty() {
        return Err(ConfigError::Invalid(
            "no platforms requested and none configured".to_string(),
        )
        .into());
    }
    Ok(platforms)
}

/// Requested kinds, defaulting to all of them
fn resolve_kinds(matches: &ArgMatches) -> Result<Vec<TaskKind>, ForgeError> {
    match matches.get_many::<String>("kind") {
        Some(values) => {
            let mut kinds = Vec::new();
            for value in values {
                kinds.push(TaskKind::from_str(value)?);
            }
            Ok(kinds)
        }
        None => Ok(TaskKind::ALL.to_vec()),
    }
}

/// Print the registry without executing anything
fn print_task_list(registry: &Registry) {
    for task in registry.iter() {
        println!(
            "{:<30} {:<12} {:<24} {}",
            task.qualified_name(),
            task.kind.to_string(),
            task.platforms.to_string(),
            if task.always { "always" } else { "" }
        );
    }
}

/// Report per-platform results; the first failure decides the exit
fn summarize(reports: &[PlatformReport], ui: Ui) -> Result<(), ForgeError> {
    let mut halted: Option<(Platform, String)> = None;

    for report in reports {
        match &report.outcome {
            Outcome::Completed => {
                ui.info(&format!(
                    "{}: {} tasks completed, {} skipped",
                    report.platform,
                    report.executed.len(),
                    report.skipped.len()
                ));
            }
            Outcome::Failed { task, error } => {
                ui.error(&format!(
                    "{}: halted at task '{}'",
                    report.platform, task
                ));
                print_failure(error);
                if halted.is_none() {
                    halted = Some((report.platform, task.clone()));
                }
            }
            Outcome::Aborted { task } => {
                ui.error(&format!(
                    "{}: aborted at task '{}'",
                    report.platform, task
                ));
                if halted.is_none() {
                    halted = Some((report.platform, task.clone()));
                }
            }
        }
    }

    match halted {
        Some((platform, task)) => Err(ForgeError::Halted { platform, task }),
        None => Ok(()),
    }
}

/// Print the failing command and its captured output verbatim
fn print_failure(error: &ExecutionError) {
    match error {
        ExecutionError::CommandFailed {
            command,
            code,
            stdout,
            stderr,
        } => {
            eprintln!("$ {}", command);
            if !stdout.is_empty() {
                eprint!("{}", stdout);
            }
            if !stderr.is_empty() {
                eprint!("{}", stderr);
            }
            eprintln!("(exit code {:?})", code);
        }
        other => eprintln!("{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    #[test]
    fn test_get_verbosity_normal() {
        let matches = build_command().get_matches_from(vec!["crossforge"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Normal);
    }

    #[test]
    fn test_get_verbosity_flags() {
        let matches = build_command().get_matches_from(vec!["crossforge", "--verbose"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Verbose);

        let matches = build_command().get_matches_from(vec!["crossforge", "-q"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Quiet);

        let matches = build_command().get_matches_from(vec!["crossforge", "-s"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Silent);
    }

    fn project_with(platforms: &[&str]) -> Project {
        let mut map = HashMap::new();
        for tag in platforms {
            map.insert(tag.to_string(), crate::config::PlatformConfig::default());
        }
        let config = crate::config::Config {
            platforms: map,
            ..Default::default()
        };
        Project::new(config, Path::new("/w/crossforge.yml"))
    }

    #[test]
    fn test_resolve_platforms_from_args() {
        let matches =
            build_command().get_matches_from(vec!["crossforge", "linux", "windows"]);
        let platforms = resolve_platforms(&matches, &project_with(&["linux"])).unwrap();
        assert_eq!(platforms, vec![Platform::Linux, Platform::Windows]);
    }

    #[test]
    fn test_resolve_platforms_defaults_to_configured() {
        let matches = build_command().get_matches_from(vec!["crossforge"]);
        let platforms =
            resolve_platforms(&matches, &project_with(&["mac", "linux"])).unwrap();
        assert_eq!(platforms, vec![Platform::Linux, Platform::Mac]);
    }

    #[test]
    fn test_resolve_platforms_unknown_tag() {
        let matches = build_command().get_matches_from(vec!["crossforge", "beos"]);
        let result = resolve_platforms(&matches, &project_with(&["linux"]));
        assert!(matches!(
            result,
            Err(ForgeError::Config(ConfigError::UnknownPlatform(_)))
        ));
    }

    #[test]
    fn test_resolve_kinds() {
        let matches = build_command().get_matches_from(vec!["crossforge", "-k", "cross"]);
        assert_eq!(resolve_kinds(&matches).unwrap(), vec![TaskKind::Cross]);

        let matches = build_command().get_matches_from(vec!["crossforge"]);
        assert_eq!(resolve_kinds(&matches).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_kinds_unknown() {
        let matches = build_command().get_matches_from(vec!["crossforge", "-k", "ruby"]);
        assert!(matches!(
            resolve_kinds(&matches),
            Err(ForgeError::Config(ConfigError::UnknownKind(_)))
        ));
    }
}
