//! Command handlers.
//!
//! Each handler writes its human- or machine-readable output to the given
//! writer so the binary and the tests share one code path.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::commands::{
    AssignmentCommand, ConfigCommand, CourseCommand, OutputFormat, ScheduleCommand,
    StatusCommand, UserCommand,
};
use super::Command;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{parse_timestamp, Assignment, Course, CourseSummary, ScheduleEntry, User};
use crate::storage::Storage;

/// Run a parsed command against the configured database.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, a record fails
/// validation or lookup, or output cannot be written.
pub fn execute(command: Command, config: &Config, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Config(cmd) => handle_config(config, cmd, out),
        Command::User(cmd) => handle_user(&open_storage(config)?, config, cmd, out),
        Command::Course(cmd) => handle_course(&open_storage(config)?, config, cmd, out),
        Command::Assignment(cmd) => handle_assignment(&open_storage(config)?, cmd, out),
        Command::Schedule(cmd) => handle_schedule(&open_storage(config)?, config, cmd, out),
        Command::Status(cmd) => handle_status(&open_storage(config)?, config, &cmd, out),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let path = config.database_path();
    debug!("Using database {}", path.display());
    Ok(Storage::open(path)?.with_limits(config.limits.clone()))
}

fn handle_user(
    storage: &Storage,
    config: &Config,
    cmd: UserCommand,
    out: &mut dyn Write,
) -> Result<()> {
    match cmd {
        UserCommand::Add { username } => {
            let user = User::new(&username);
            let id = storage.insert_user(&user)?;
            writeln!(out, "Created user {} (#{id})", user.username)?;
        }
        UserCommand::List { limit, format } => {
            let users = storage.list_users(limit.unwrap_or(config.limits.list_limit))?;
            match format {
                OutputFormat::Json => write_json(out, &users)?,
                OutputFormat::Plain => {
                    for user in &users {
                        writeln!(out, "{}\t{}", id_of(user.id), user.username)?;
                    }
                }
                OutputFormat::Table => {
                    let rows = users
                        .iter()
                        .map(|u| {
                            vec![
                                id_of(u.id),
                                u.username.clone(),
                                format_time(&u.created_at),
                            ]
                        })
                        .collect();
                    write_table(out, &["ID", "USERNAME", "CREATED"], rows)?;
                }
            }
        }
        UserCommand::Remove { username } => {
            let user = storage.require_user(&username)?;
            remove_user(storage, &user, out)?;
        }
    }
    Ok(())
}

fn remove_user(storage: &Storage, user: &User, out: &mut dyn Write) -> Result<()> {
    let id = user.id.ok_or_else(|| Error::internal("stored user without id"))?;
    // The row may have gone between lookup and delete.
    if !storage.delete_user(id)? {
        return Err(Error::not_found("user", &user.username));
    }
    writeln!(out, "Removed user {} and their courses", user.username)?;
    Ok(())
}

fn handle_course(
    storage: &Storage,
    config: &Config,
    cmd: CourseCommand,
    out: &mut dyn Write,
) -> Result<()> {
    match cmd {
        CourseCommand::Add { user, name, term } => {
            let owner = storage.require_user(&user)?;
            let owner_id = owner.id.ok_or_else(|| Error::internal("stored user without id"))?;
            let course = Course::new(owner_id, &name, &term);
            let id = storage.insert_course(&course)?;
            writeln!(out, "Added course #{id}: {course}")?;
        }
        CourseCommand::List {
            user,
            search,
            limit,
            format,
        } => {
            let owner = storage.require_user(&user)?;
            let owner_id = owner.id.ok_or_else(|| Error::internal("stored user without id"))?;
            let limit = limit.unwrap_or(config.limits.list_limit);
            let summaries = match search {
                Some(query) => storage.search_courses(owner_id, &query, limit)?,
                None => storage.course_summaries(owner_id, limit)?,
            };
            write_summaries(out, &summaries, format)?;
        }
        CourseCommand::Show { id, format } => {
            let course = storage.require_course(id)?;
            let owner = storage.get_user(course.user_id)?;
            let assignments = storage.assignments_for_course(id)?;
            let schedule = storage.schedule_for_course(id)?;

            if format == OutputFormat::Json {
                let value = json!({
                    "course": course,
                    "owner": owner.map(|u| u.username),
                    "assignments": assignments,
                    "schedule": schedule,
                });
                write_json(out, &value)?;
            } else {
                writeln!(out, "#{id} {course}")?;
                if let Some(owner) = owner {
                    writeln!(out, "Owner: {}", owner.username)?;
                }
                writeln!(out)?;
                writeln!(out, "Assignments ({}):", assignments.len())?;
                for assignment in &assignments {
                    writeln!(out, "  {}", describe_assignment(assignment))?;
                }
                writeln!(out)?;
                writeln!(out, "Schedule ({}):", schedule.len())?;
                for entry in &schedule {
                    writeln!(out, "  {}", describe_entry(entry))?;
                }
            }
        }
        CourseCommand::Update { id, name, term } => {
            if name.is_none() && term.is_none() {
                return Err(Error::validation(
                    "update",
                    "nothing to change, pass --name or --term",
                ));
            }
            let mut course = storage.require_course(id)?;
            if let Some(name) = name {
                course.name = name.trim().to_string();
            }
            if let Some(term) = term {
                course.term = term.trim().to_string();
            }
            storage.update_course(&course)?;
            writeln!(out, "Updated course #{id}: {course}")?;
        }
        CourseCommand::Remove { id } => {
            let course = storage.require_course(id)?;
            storage.delete_course(id)?;
            writeln!(out, "Removed course #{id}: {course}")?;
        }
    }
    Ok(())
}

fn handle_assignment(storage: &Storage, cmd: AssignmentCommand, out: &mut dyn Write) -> Result<()> {
    match cmd {
        AssignmentCommand::Add {
            course_id,
            title,
            due,
        } => {
            let due_at = due.as_deref().map(parse_timestamp).transpose()?;
            let assignment = Assignment::new(course_id, &title, due_at);
            let id = storage.insert_assignment(&assignment)?;
            writeln!(out, "Added assignment #{id} to course #{course_id}")?;
        }
        AssignmentCommand::List { course_id, format } => {
            storage.require_course(course_id)?;
            let assignments = storage.assignments_for_course(course_id)?;
            match format {
                OutputFormat::Json => write_json(out, &assignments)?,
                OutputFormat::Plain => {
                    for assignment in &assignments {
                        writeln!(out, "{}", describe_assignment(assignment))?;
                    }
                }
                OutputFormat::Table => {
                    let rows = assignments
                        .iter()
                        .map(|a| {
                            vec![
                                id_of(a.id),
                                a.due_at.as_ref().map_or_else(|| "-".to_string(), format_time),
                                a.title.clone(),
                            ]
                        })
                        .collect();
                    write_table(out, &["ID", "DUE", "TITLE"], rows)?;
                }
            }
        }
        AssignmentCommand::Remove { id } => {
            if !storage.delete_assignment(id)? {
                return Err(Error::not_found("assignment", id));
            }
            writeln!(out, "Removed assignment #{id}")?;
        }
    }
    Ok(())
}

fn handle_schedule(
    storage: &Storage,
    config: &Config,
    cmd: ScheduleCommand,
    out: &mut dyn Write,
) -> Result<()> {
    match cmd {
        ScheduleCommand::Add {
            course_id,
            starts,
            ends,
            label,
        } => {
            let entry = ScheduleEntry::new(
                course_id,
                parse_timestamp(&starts)?,
                parse_timestamp(&ends)?,
                label.as_deref(),
            );
            let id = storage.insert_schedule_entry(&entry)?;
            writeln!(out, "Added schedule entry #{id} to course #{course_id}")?;
        }
        ScheduleCommand::List {
            user,
            since,
            until,
            limit,
            format,
        } => {
            let owner = storage.require_user(&user)?;
            let owner_id = owner.id.ok_or_else(|| Error::internal("stored user without id"))?;
            let since = since.as_deref().map(parse_timestamp).transpose()?;
            let until = until.as_deref().map(parse_timestamp).transpose()?;
            let entries = storage.schedule_for_user(
                owner_id,
                since,
                until,
                limit.unwrap_or(config.limits.list_limit),
            )?;

            match format {
                OutputFormat::Json => write_json(out, &entries)?,
                OutputFormat::Plain => {
                    for entry in &entries {
                        writeln!(out, "{}", describe_entry(entry))?;
                    }
                }
                OutputFormat::Table => {
                    let rows = entries
                        .iter()
                        .map(|e| {
                            vec![
                                id_of(e.id),
                                e.course_id.to_string(),
                                format_time(&e.starts_at),
                                format_time(&e.ends_at),
                                e.label.clone().unwrap_or_default(),
                            ]
                        })
                        .collect();
                    write_table(out, &["ID", "COURSE", "STARTS", "ENDS", "LABEL"], rows)?;
                }
            }
        }
        ScheduleCommand::Remove { id } => {
            if !storage.delete_schedule_entry(id)? {
                return Err(Error::not_found("schedule entry", id));
            }
            writeln!(out, "Removed schedule entry #{id}")?;
        }
    }
    Ok(())
}

fn handle_status(
    storage: &Storage,
    config: &Config,
    cmd: &StatusCommand,
    out: &mut dyn Write,
) -> Result<()> {
    let stats = storage.stats()?;
    if cmd.json {
        let status = json!({
            "database_path": config.database_path(),
            "stats": stats,
        });
        write_json(out, &status)?;
    } else {
        writeln!(out, "syllabify status")?;
        writeln!(out, "----------------")?;
        writeln!(out, "Database:         {}", config.database_path().display())?;
        writeln!(out, "Schema version:   {}", stats.schema_version)?;
        writeln!(out, "Size:             {} bytes", stats.db_size_bytes)?;
        writeln!(out, "Users:            {}", stats.users)?;
        writeln!(out, "Courses:          {}", stats.courses)?;
        writeln!(out, "Assignments:      {}", stats.assignments)?;
        writeln!(out, "Schedule entries: {}", stats.schedule_entries)?;
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand, out: &mut dyn Write) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                write_json(out, config)?;
            } else {
                writeln!(out, "Current Configuration")?;
                writeln!(out, "=====================")?;
                writeln!(out)?;
                writeln!(out, "[Storage]")?;
                writeln!(out, "  Database path:       {}", config.database_path().display())?;
                writeln!(out)?;
                writeln!(out, "[Limits]")?;
                writeln!(out, "  Max username length: {}", config.limits.max_username_length)?;
                writeln!(out, "  Max name length:     {}", config.limits.max_name_length)?;
                writeln!(out, "  Max term length:     {}", config.limits.max_term_length)?;
                writeln!(out, "  Max title length:    {}", config.limits.max_title_length)?;
                writeln!(out, "  List limit:          {}", config.limits.list_limit)?;
            }
        }
        ConfigCommand::Path => {
            writeln!(out, "{}", Config::default_config_path().display())?;
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            writeln!(out, "Validating configuration: {}", path.display())?;
            Config::load_from(Some(path))?;
            writeln!(out, "Configuration is valid.")?;
        }
    }
    Ok(())
}

fn write_summaries(
    out: &mut dyn Write,
    summaries: &[CourseSummary],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, &summaries)?,
        OutputFormat::Plain => {
            for s in summaries {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{} assignments",
                    id_of(s.course.id),
                    s.course.name,
                    s.course.term,
                    s.assignment_count
                )?;
            }
        }
        OutputFormat::Table => {
            let rows = summaries
                .iter()
                .map(|s| {
                    vec![
                        id_of(s.course.id),
                        s.course.name.clone(),
                        s.course.term.clone(),
                        s.assignment_count.to_string(),
                    ]
                })
                .collect();
            write_table(out, &["ID", "NAME", "TERM", "ASSIGNMENTS"], rows)?;
        }
    }
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Left-aligned columns padded to the widest cell.
fn write_table(out: &mut dyn Write, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header_row: Vec<String> = headers.iter().map(ToString::to_string).collect();
    for row in std::iter::once(&header_row).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

fn describe_assignment(assignment: &Assignment) -> String {
    let due = assignment
        .due_at
        .as_ref()
        .map_or_else(|| "(no due date)".to_string(), format_time);
    format!("#{}  {due}  {}", id_of(assignment.id), assignment.title)
}

fn describe_entry(entry: &ScheduleEntry) -> String {
    let mut line = format!(
        "#{}  course #{}  {} - {}",
        id_of(entry.id),
        entry.course_id,
        format_time(&entry.starts_at),
        format_time(&entry.ends_at)
    );
    if let Some(label) = &entry.label {
        line.push_str("  ");
        line.push_str(label);
    }
    line
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn id_of(id: Option<i64>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}
