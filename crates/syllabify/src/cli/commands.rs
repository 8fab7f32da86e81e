//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// User management commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Create a user
    Add {
        /// Login name (must be unique)
        username: String,
    },

    /// List users
    List {
        /// Maximum number of results (defaults to the configured list limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Delete a user together with all of their courses
    Remove {
        /// Login name
        username: String,
    },
}

/// Course management commands.
#[derive(Debug, Subcommand)]
pub enum CourseCommand {
    /// Add a course for a user
    Add {
        /// Owner of the course
        #[arg(short, long)]
        user: String,

        /// Course name, e.g. "CS 101"
        name: String,

        /// Academic term, e.g. "Fall 2025"
        term: String,
    },

    /// List a user's courses with assignment counts
    List {
        /// Owner of the courses
        #[arg(short, long)]
        user: String,

        /// Only courses whose name contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of results (defaults to the configured list limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show a course with its assignments and schedule
    Show {
        /// Course ID
        id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Rename a course or move it to another term
    Update {
        /// Course ID
        id: i64,

        /// New course name
        #[arg(short, long)]
        name: Option<String>,

        /// New academic term
        #[arg(short, long)]
        term: Option<String>,
    },

    /// Delete a course with its assignments and schedule
    Remove {
        /// Course ID
        id: i64,
    },
}

/// Assignment commands.
#[derive(Debug, Subcommand)]
pub enum AssignmentCommand {
    /// Add an assignment to a course
    Add {
        /// Course ID
        course_id: i64,

        /// What needs to be done
        title: String,

        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(short, long)]
        due: Option<String>,
    },

    /// List a course's assignments, soonest due first
    List {
        /// Course ID
        course_id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Delete an assignment
    Remove {
        /// Assignment ID
        id: i64,
    },
}

/// Schedule commands.
#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Add a block of time to a course's schedule
    Add {
        /// Course ID
        course_id: i64,

        /// Start time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        starts: String,

        /// End time (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        ends: String,

        /// Optional label, e.g. "Lecture"
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List a user's schedule across all courses
    List {
        /// Owner of the courses
        #[arg(short, long)]
        user: String,

        /// Only entries starting at or after this time
        #[arg(long)]
        since: Option<String>,

        /// Only entries starting before this time
        #[arg(long)]
        until: Option<String>,

        /// Maximum number of results (defaults to the configured list limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete a schedule entry
    Remove {
        /// Schedule entry ID
        id: i64,
    },
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
