//! Command-line interface for syllabify.
//!
//! This module provides the CLI structure and command handlers for the
//! `syllabify` binary.

mod commands;
mod handlers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AssignmentCommand, ConfigCommand, CourseCommand, OutputFormat, ScheduleCommand,
    StatusCommand, UserCommand,
};
pub use handlers::execute;

use crate::logging::Verbosity;

/// syllabify - Keep track of courses, assignments and schedules
///
/// Stores each user's courses per academic term, along with the assignments
/// and scheduled sessions that belong to them.
#[derive(Debug, Parser)]
#[command(name = "syllabify")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage courses
    #[command(subcommand)]
    Course(CourseCommand),

    /// Manage a course's assignments
    #[command(subcommand)]
    Assignment(AssignmentCommand),

    /// Manage course schedules
    #[command(subcommand)]
    Schedule(ScheduleCommand),

    /// Show database statistics
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "syllabify");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["syllabify", "-q", "status"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Quiet);

        let cli = Cli::try_parse_from(["syllabify", "status"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Normal);

        let cli = Cli::try_parse_from(["syllabify", "-vv", "status"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["syllabify", "-c", "/custom/config.toml", "status"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_user_add() {
        let cli = Cli::try_parse_from(["syllabify", "user", "add", "alice"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::User(UserCommand::Add { ref username }) if username == "alice"
        ));
    }

    #[test]
    fn test_parse_course_add() {
        let cli = Cli::try_parse_from([
            "syllabify",
            "course",
            "add",
            "--user",
            "alice",
            "Linear Algebra",
            "Fall 2025",
        ])
        .unwrap();
        match cli.command {
            Command::Course(CourseCommand::Add { user, name, term }) => {
                assert_eq!(user, "alice");
                assert_eq!(name, "Linear Algebra");
                assert_eq!(term, "Fall 2025");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_course_list_defaults() {
        let cli = Cli::try_parse_from(["syllabify", "course", "list", "-u", "alice"]).unwrap();
        match cli.command {
            Command::Course(CourseCommand::List {
                search,
                limit,
                format,
                ..
            }) => {
                assert!(search.is_none());
                assert!(limit.is_none());
                assert_eq!(format, OutputFormat::Table);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_course_update() {
        let cli =
            Cli::try_parse_from(["syllabify", "course", "update", "4", "--term", "Spring 2026"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Command::Course(CourseCommand::Update { id: 4, name: None, term: Some(_) })
        ));
    }

    #[test]
    fn test_parse_assignment_add_with_due() {
        let cli = Cli::try_parse_from([
            "syllabify",
            "assignment",
            "add",
            "2",
            "Problem set 3",
            "--due",
            "2025-10-01",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Assignment(AssignmentCommand::Add { course_id: 2, due: Some(_), .. })
        ));
    }

    #[test]
    fn test_parse_schedule_add() {
        let cli = Cli::try_parse_from([
            "syllabify",
            "schedule",
            "add",
            "1",
            "--starts",
            "2025-09-01T09:00:00Z",
            "--ends",
            "2025-09-01T10:00:00Z",
            "-l",
            "Lecture",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Schedule(ScheduleCommand::Add { course_id: 1, .. })
        ));
    }

    #[test]
    fn test_parse_schedule_add_requires_bounds() {
        let result = Cli::try_parse_from(["syllabify", "schedule", "add", "1", "--starts", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_validate() {
        let cli =
            Cli::try_parse_from(["syllabify", "config", "validate", "-f", "/tmp/c.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_rejects_non_numeric_id() {
        assert!(Cli::try_parse_from(["syllabify", "course", "show", "abc"]).is_err());
    }
}
