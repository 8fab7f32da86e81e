//! `SQLite` schema definitions for syllabify.
//!
//! Tables are in third normal form: a course stores only its owner's id, and
//! assignment counts are derived at query time.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the courses table.
pub const CREATE_COURSES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS courses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    term TEXT NOT NULL,
    UNIQUE (user_id, name, term)
)
";

/// SQL statement to create the assignments table.
pub const CREATE_ASSIGNMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    due_at TEXT
)
";

/// SQL statement to create the schedule entries table.
pub const CREATE_SCHEDULE_ENTRIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS schedule_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id INTEGER NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    starts_at TEXT NOT NULL,
    ends_at TEXT NOT NULL,
    label TEXT,
    CHECK (starts_at < ends_at)
)
";

/// Index for listing a user's courses.
pub const CREATE_COURSES_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_courses_user ON courses(user_id)
";

/// Index for listing and counting a course's assignments.
pub const CREATE_ASSIGNMENTS_COURSE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_assignments_course ON assignments(course_id)
";

/// Index for listing a course's schedule in time order.
pub const CREATE_SCHEDULE_COURSE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_schedule_course ON schedule_entries(course_id, starts_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in dependency order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_COURSES_TABLE,
    CREATE_ASSIGNMENTS_TABLE,
    CREATE_SCHEDULE_ENTRIES_TABLE,
    CREATE_COURSES_USER_INDEX,
    CREATE_ASSIGNMENTS_COURSE_INDEX,
    CREATE_SCHEDULE_COURSE_INDEX,
    CREATE_METADATA_TABLE,
];
