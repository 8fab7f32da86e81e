//! Storage layer for syllabify.
//!
//! This module provides `SQLite`-based persistent storage for users, their
//! courses, and each course's assignments and schedule.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::config::LimitsConfig;
use crate::error::{Error, Result};
use crate::model::{Assignment, Course, CourseSummary, ScheduleEntry, User};

const COURSE_COLUMNS: &str = "id, user_id, name, term";
const ASSIGNMENT_COLUMNS: &str = "id, course_id, title, due_at";
const SCHEDULE_COLUMNS: &str = "id, course_id, starts_at, ends_at, label";

/// Storage engine for course data.
///
/// Provides persistent storage using `SQLite` with support for:
/// - Users and the courses they own
/// - Assignments and schedule entries per course
/// - Cascading deletes from user to course to coursework
/// - Per-course assignment counts
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Limits checked before every write.
    limits: LimitsConfig,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::prepare(path, conn)
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::prepare(PathBuf::from(":memory:"), conn)
    }

    fn prepare(path: PathBuf, conn: Connection) -> Result<Self> {
        // Off by default in SQLite; cascades depend on it.
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            fold_case,
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database ready at {}", path.display());
        Ok(Self {
            path,
            conn,
            limits: LimitsConfig::default(),
        })
    }

    /// Replace the limits used to validate writes.
    #[must_use]
    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the limits used to validate writes.
    #[must_use]
    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    // === Users ===

    /// Insert a user, returning the assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad username and
    /// [`Error::Duplicate`] if the username is taken.
    pub fn insert_user(&self, user: &User) -> Result<i64> {
        user.validate(&self.limits)?;

        self.conn
            .execute(
                "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
                params![user.username, format_timestamp(&user.created_at)],
            )
            .map_err(|e| map_constraint(e, "user", &user.username, None))?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted user {} with id {}", user.username, id);
        Ok(id)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                [id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                [username.trim()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Look up a user by username, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such user exists.
    pub fn require_user(&self, username: &str) -> Result<User> {
        self.get_user_by_username(username)?
            .ok_or_else(|| Error::not_found("user", username.trim()))
    }

    /// List users ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_users(&self, limit: usize) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, created_at FROM users ORDER BY username LIMIT ?1",
        )?;
        let users = stmt
            .query_map([sql_limit(limit)], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Delete a user and, by cascade, everything they own.
    ///
    /// Returns `true` if a user was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        if affected > 0 {
            info!("Deleted user {} and their courses", id);
        }
        Ok(affected > 0)
    }

    // === Courses ===

    /// Insert a course, returning the assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad name or term,
    /// [`Error::NotFound`] if the owner does not exist, and
    /// [`Error::Duplicate`] if the owner already has this course in this term.
    pub fn insert_course(&self, course: &Course) -> Result<i64> {
        course.validate(&self.limits)?;
        if self.get_user(course.user_id)?.is_none() {
            return Err(Error::not_found("user", course.user_id));
        }

        self.conn
            .execute(
                "INSERT INTO courses (user_id, name, term) VALUES (?1, ?2, ?3)",
                params![course.user_id, course.name, course.term],
            )
            .map_err(|e| map_constraint(e, "course", course, Some(("user", course.user_id))))?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted course '{}' with id {}", course, id);
        Ok(id)
    }

    /// Get a course by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_course(&self, id: i64) -> Result<Option<Course>> {
        let course = self
            .conn
            .query_row(
                &format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1"),
                [id],
                row_to_course,
            )
            .optional()?;
        Ok(course)
    }

    /// Get a course by ID, failing if absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such course exists.
    pub fn require_course(&self, id: i64) -> Result<Course> {
        self.get_course(id)?
            .ok_or_else(|| Error::not_found("course", id))
    }

    /// All courses owned by a user, ordered by term then name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn courses_for_user(&self, user_id: i64) -> Result<Vec<Course>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE user_id = ?1 ORDER BY term, name"
        ))?;
        let courses = stmt
            .query_map([user_id], row_to_course)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(courses)
    }

    /// A user's courses with their assignment counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn course_summaries(&self, user_id: i64, limit: usize) -> Result<Vec<CourseSummary>> {
        self.query_summaries(user_id, None, limit)
    }

    /// Search a user's courses by name, with their assignment counts.
    ///
    /// Performs a case-insensitive substring match. Case is folded with
    /// Unicode rules, so "économie" finds "Économie".
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn search_courses(
        &self,
        user_id: i64,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CourseSummary>> {
        let needle = query.trim().to_lowercase();
        self.query_summaries(user_id, Some(needle), limit)
    }

    fn query_summaries(
        &self,
        user_id: i64,
        needle: Option<String>,
        limit: usize,
    ) -> Result<Vec<CourseSummary>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT c.id, c.user_id, c.name, c.term, COUNT(a.id)
            FROM courses c LEFT JOIN assignments a ON a.course_id = c.id
            WHERE c.user_id = ?1 AND (?2 IS NULL OR instr(fold_case(c.name), ?2) > 0)
            GROUP BY c.id
            ORDER BY c.term, c.name LIMIT ?3
            ",
        )?;
        let summaries = stmt
            .query_map(params![user_id, needle, sql_limit(limit)], |row| {
                Ok(CourseSummary {
                    course: row_to_course(row)?,
                    assignment_count: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    /// Rename a course or move it to another term.
    ///
    /// Returns `true` if the course was updated, `false` if not found. The
    /// owner cannot be changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad name or term, or an unsaved
    /// course, and [`Error::Duplicate`] if the new name and term collide with
    /// another of the owner's courses.
    pub fn update_course(&self, course: &Course) -> Result<bool> {
        let id = course
            .id
            .ok_or_else(|| Error::validation("id", "course has not been saved"))?;
        course.validate(&self.limits)?;

        let affected = self
            .conn
            .execute(
                "UPDATE courses SET name = ?1, term = ?2 WHERE id = ?3",
                params![course.name, course.term, id],
            )
            .map_err(|e| map_constraint(e, "course", course, Some(("user", course.user_id))))?;

        debug!("Updated course {} to '{}'", id, course);
        Ok(affected > 0)
    }

    /// Delete a course along with its assignments and schedule.
    ///
    /// Returns `true` if a course was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_course(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM courses WHERE id = ?1", [id])?;
        if affected > 0 {
            info!("Deleted course {}", id);
        }
        Ok(affected > 0)
    }

    // === Assignments ===

    /// Insert an assignment, returning the assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad title and [`Error::NotFound`]
    /// if the course does not exist.
    pub fn insert_assignment(&self, assignment: &Assignment) -> Result<i64> {
        assignment.validate(&self.limits)?;
        self.require_course(assignment.course_id)?;

        self.conn
            .execute(
                "INSERT INTO assignments (course_id, title, due_at) VALUES (?1, ?2, ?3)",
                params![
                    assignment.course_id,
                    assignment.title,
                    assignment.due_at.as_ref().map(format_timestamp),
                ],
            )
            .map_err(|e| {
                map_constraint(
                    e,
                    "assignment",
                    &assignment.title,
                    Some(("course", assignment.course_id)),
                )
            })?;

        let id = self.conn.last_insert_rowid();
        debug!(
            "Inserted assignment {} for course {}",
            id, assignment.course_id
        );
        Ok(id)
    }

    /// Get an assignment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_assignment(&self, id: i64) -> Result<Option<Assignment>> {
        let assignment = self
            .conn
            .query_row(
                &format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1"),
                [id],
                row_to_assignment,
            )
            .optional()?;
        Ok(assignment)
    }

    /// A course's assignments, soonest due first, undated ones last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn assignments_for_course(&self, course_id: i64) -> Result<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE course_id = ?1
            ORDER BY due_at IS NULL, due_at, id
            "
        ))?;
        let assignments = stmt
            .query_map([course_id], row_to_assignment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(assignments)
    }

    /// Delete an assignment by ID.
    ///
    /// Returns `true` if an assignment was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_assignment(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM assignments WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Schedule ===

    /// Insert a schedule entry, returning the assigned ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an empty or inverted time range and
    /// [`Error::NotFound`] if the course does not exist.
    pub fn insert_schedule_entry(&self, entry: &ScheduleEntry) -> Result<i64> {
        entry.validate(&self.limits)?;
        self.require_course(entry.course_id)?;

        self.conn
            .execute(
                r"
                INSERT INTO schedule_entries (course_id, starts_at, ends_at, label)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![
                    entry.course_id,
                    format_timestamp(&entry.starts_at),
                    format_timestamp(&entry.ends_at),
                    entry.label,
                ],
            )
            .map_err(|e| {
                map_constraint(
                    e,
                    "schedule entry",
                    entry.course_id,
                    Some(("course", entry.course_id)),
                )
            })?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted schedule entry {} for course {}", id, entry.course_id);
        Ok(id)
    }

    /// A course's schedule in start order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn schedule_for_course(&self, course_id: i64) -> Result<Vec<ScheduleEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {SCHEDULE_COLUMNS} FROM schedule_entries WHERE course_id = ?1
            ORDER BY starts_at, id
            "
        ))?;
        let entries = stmt
            .query_map([course_id], row_to_schedule_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Schedule entries across all of a user's courses, in start order.
    ///
    /// `since` is inclusive and `until` exclusive; both apply to the start
    /// time and either may be omitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn schedule_for_user(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<ScheduleEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT s.id, s.course_id, s.starts_at, s.ends_at, s.label
            FROM schedule_entries s JOIN courses c ON c.id = s.course_id
            WHERE c.user_id = ?1
              AND (?2 IS NULL OR s.starts_at >= ?2)
              AND (?3 IS NULL OR s.starts_at < ?3)
            ORDER BY s.starts_at, s.id LIMIT ?4
            ",
        )?;
        let entries = stmt
            .query_map(
                params![
                    user_id,
                    since.as_ref().map(format_timestamp),
                    until.as_ref().map(format_timestamp),
                    sql_limit(limit),
                ],
                row_to_schedule_entry,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Delete a schedule entry by ID.
    ///
    /// Returns `true` if an entry was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_schedule_entry(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM schedule_entries WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Stats ===

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or the database
    /// file cannot be inspected.
    pub fn stats(&self) -> Result<StorageStats> {
        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path)?.len() + sidecar_size(&wal_path(&self.path))?
        };

        Ok(StorageStats {
            users: self.count("users")?,
            courses: self.count("courses")?,
            assignments: self.count("assignments")?,
            schedule_entries: self.count("schedule_entries")?,
            schema_version: migrations::get_schema_version(&self.conn)?,
            db_size_bytes,
        })
    }

    fn count(&self, table: &'static str) -> Result<i64> {
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Number of users.
    pub users: i64,
    /// Number of courses.
    pub courses: i64,
    /// Number of assignments.
    pub assignments: i64,
    /// Number of schedule entries.
    pub schedule_entries: i64,
    /// Schema version recorded in the database.
    pub schema_version: i32,
    /// Size of the database file and its write-ahead log in bytes.
    pub db_size_bytes: u64,
}

/// Fixed-width UTC timestamps so that text comparison matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn wal_path(db_path: &Path) -> PathBuf {
    let mut wal = db_path.as_os_str().to_owned();
    wal.push("-wal");
    PathBuf::from(wal)
}

/// Size of a file SQLite may or may not have created yet.
fn sidecar_size(path: &Path) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Lowercases text with Unicode rules; SQLite's own `lower()` is ASCII-only.
fn fold_case(ctx: &Context<'_>) -> rusqlite::Result<String> {
    let value: String = ctx.get(0)?;
    Ok(value.to_lowercase())
}

fn parse_timestamp_column(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(2)?;
    Ok(User {
        id: Some(row.get(0)?),
        username: row.get(1)?,
        created_at: parse_timestamp_column(2, &created_at)?,
    })
}

fn row_to_course(row: &rusqlite::Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: Some(row.get(0)?),
        user_id: row.get(1)?,
        name: row.get(2)?,
        term: row.get(3)?,
    })
}

fn row_to_assignment(row: &rusqlite::Row) -> rusqlite::Result<Assignment> {
    let due_at: Option<String> = row.get(3)?;
    Ok(Assignment {
        id: Some(row.get(0)?),
        course_id: row.get(1)?,
        title: row.get(2)?,
        due_at: due_at
            .map(|s| parse_timestamp_column(3, &s))
            .transpose()?,
    })
}

fn row_to_schedule_entry(row: &rusqlite::Row) -> rusqlite::Result<ScheduleEntry> {
    let starts_at: String = row.get(2)?;
    let ends_at: String = row.get(3)?;
    Ok(ScheduleEntry {
        id: Some(row.get(0)?),
        course_id: row.get(1)?,
        starts_at: parse_timestamp_column(2, &starts_at)?,
        ends_at: parse_timestamp_column(3, &ends_at)?,
        label: row.get(4)?,
    })
}

/// Translate SQLite constraint failures into model errors.
///
/// `parent` is the table and id a foreign key on the row points at.
fn map_constraint(
    err: rusqlite::Error,
    entity: &'static str,
    key: impl ToString,
    parent: Option<(&'static str, i64)>,
) -> Error {
    if let rusqlite::Error::SqliteFailure(ffi_err, message) = &err {
        if ffi_err.code == ErrorCode::ConstraintViolation {
            match (ffi_err.extended_code, parent) {
                (rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE, _) => {
                    return Error::duplicate(entity, key)
                }
                (rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY, Some((table, id))) => {
                    return Error::not_found(table, id)
                }
                (rusqlite::ffi::SQLITE_CONSTRAINT_CHECK, _) => {
                    return Error::validation(
                        entity,
                        message.as_deref().unwrap_or("check constraint failed"),
                    )
                }
                _ => {}
            }
        }
    }
    Error::DatabaseQuery(err)
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
