//! CLI command definitions and handlers

pub mod help;
pub mod sync;
pub mod up;

use crate::project::Project;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Drag - pull or build compose service images by git content hash
#[derive(Parser)]
#[command(name = "drag")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pull or build all images defined in the compose file
    Sync(sync::SyncArgs),

    /// Start the project (not implemented yet)
    Up(up::UpArgs),

    /// Show help for drag or one of its commands
    Help(help::HelpArgs),
}

/// Where the compose project comes from
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Specify an alternate compose file
    #[arg(short = 'f', long = "file", global = true, env = "COMPOSE_FILE")]
    pub file: Option<PathBuf>,

    /// Specify an alternate project name (default: directory name)
    #[arg(short = 'p', long, global = true, env = "COMPOSE_PROJECT_NAME")]
    pub project_name: Option<String>,
}

impl ProjectArgs {
    /// Load the compose project relative to the current directory
    pub fn load(&self) -> crate::Result<Project> {
        let working_dir = std::env::current_dir()?;
        let compose = Project::find_compose_file(&working_dir, self.file.as_deref())?;
        Project::load(&compose, &working_dir, self.project_name.as_deref())
    }
}

/// Log output settings
#[derive(Args, Debug, Clone, Default)]
pub struct LoggingArgs {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Show more output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Do not print ANSI control characters
    #[arg(long, global = true)]
    pub no_ansi: bool,
}

impl LoggingArgs {
    /// Filter directive from the flags, `None` defers to `RUST_LOG`
    pub fn directive(&self) -> Option<String> {
        match (&self.log_level, self.verbose) {
            (Some(level), _) => Some(level.to_lowercase()),
            (None, true) => Some("debug".to_string()),
            (None, false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync() {
        let cli = Cli::try_parse_from([
            "drag",
            "-f",
            "stack.yml",
            "sync",
            "--repo=asia.gcr.io/acme",
            "--push",
            "--disable-parallel",
            "web",
            "worker",
        ])
        .unwrap();

        assert_eq!(cli.project.file, Some(PathBuf::from("stack.yml")));
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.repo.as_deref(), Some("asia.gcr.io/acme"));
                assert!(args.push);
                assert!(args.disable_parallel);
                assert_eq!(args.services, vec!["web", "worker"]);
                assert_eq!(args.parallel_limit, crate::sync::DEFAULT_LIMIT);
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_sync_defaults() {
        let cli = Cli::try_parse_from(["drag", "sync"]).unwrap();
        match cli.command {
            Commands::Sync(args) => {
                assert!(args.repo.is_none());
                assert!(!args.push);
                assert!(!args.disable_parallel);
                assert!(args.services.is_empty());
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn test_parallel_limit_must_be_positive() {
        assert!(Cli::try_parse_from(["drag", "sync", "--parallel-limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["drag", "sync", "--parallel-limit", "2"]).is_ok());
    }

    #[test]
    fn test_unknown_command() {
        assert!(Cli::try_parse_from(["drag", "exec"]).is_err());
    }

    #[test]
    fn test_help_command() {
        let cli = Cli::try_parse_from(["drag", "help", "sync"]).unwrap();
        match cli.command {
            Commands::Help(args) => assert_eq!(args.command.as_deref(), Some("sync")),
            _ => panic!("expected help"),
        }
    }

    #[test]
    fn test_log_directive() {
        let mut logging = LoggingArgs::default();
        assert_eq!(logging.directive(), None);
        logging.verbose = true;
        assert_eq!(logging.directive().as_deref(), Some("debug"));
        logging.log_level = Some("WARN".to_string());
        assert_eq!(logging.directive().as_deref(), Some("warn"));
    }
}
