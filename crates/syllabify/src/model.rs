//! Core record types for syllabify.
//!
//! A [`User`] owns many [`Course`]s; each course has many [`Assignment`]s and
//! [`ScheduleEntry`]s. Ids are assigned by the storage layer and are `None`
//! until a record has been inserted.
//!
//! Timestamps are kept at microsecond precision, the precision they are
//! stored with.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LimitsConfig;
use crate::error::{Error, Result};

/// An account that owns courses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Login name, unique across all users.
    pub username: String,

    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new, unsaved user.
    #[must_use]
    pub fn new(username: &str) -> Self {
        Self {
            id: None,
            username: username.trim().to_string(),
            created_at: to_micros(Utc::now()),
        }
    }

    /// Check the user against the configured limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the username is empty or too long.
    pub fn validate(&self, limits: &LimitsConfig) -> Result<()> {
        check_text("username", &self.username, limits.max_username_length)
    }
}

/// A course taken by a user in a given academic term.
///
/// `(user_id, name, term)` is the natural key of a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique identifier (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// The owning user.
    pub user_id: i64,

    /// Course name, e.g. "CS 101: Intro to Programming".
    pub name: String,

    /// Academic term, e.g. "Fall 2025".
    pub term: String,
}

impl Course {
    /// Create a new, unsaved course.
    #[must_use]
    pub fn new(user_id: i64, name: &str, term: &str) -> Self {
        Self {
            id: None,
            user_id,
            name: name.trim().to_string(),
            term: term.trim().to_string(),
        }
    }

    /// Check the course against the configured limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the name or term is empty or too long.
    pub fn validate(&self, limits: &LimitsConfig) -> Result<()> {
        check_text("name", &self.name, limits.max_name_length)?;
        check_text("term", &self.term, limits.max_term_length)
    }
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.term)
    }
}

/// A piece of coursework belonging to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Unique identifier (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// The course this assignment belongs to.
    pub course_id: i64,

    /// Short description of the work.
    pub title: String,

    /// Deadline, if one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Create a new, unsaved assignment.
    #[must_use]
    pub fn new(course_id: i64, title: &str, due_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: None,
            course_id,
            title: title.trim().to_string(),
            due_at: due_at.map(to_micros),
        }
    }

    /// Check the assignment against the configured limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the title is empty or too long.
    pub fn validate(&self, limits: &LimitsConfig) -> Result<()> {
        check_text("title", &self.title, limits.max_title_length)
    }
}

/// A block of time on a course's schedule (a lecture, lab, study session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Unique identifier (assigned by storage layer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// The course this entry belongs to.
    pub course_id: i64,

    /// Start of the block.
    pub starts_at: DateTime<Utc>,

    /// End of the block (exclusive).
    pub ends_at: DateTime<Utc>,

    /// Optional free-form label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ScheduleEntry {
    /// Create a new, unsaved schedule entry.
    ///
    /// Blank labels are stored as `None`.
    #[must_use]
    pub fn new(
        course_id: i64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        label: Option<&str>,
    ) -> Self {
        Self {
            id: None,
            course_id,
            starts_at: to_micros(starts_at),
            ends_at: to_micros(ends_at),
            label: label
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(ToString::to_string),
        }
    }

    /// Check the entry's time range and label.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the entry does not end after it
    /// starts, or if the label is too long.
    pub fn validate(&self, limits: &LimitsConfig) -> Result<()> {
        if to_micros(self.starts_at) >= to_micros(self.ends_at) {
            return Err(Error::validation(
                "ends_at",
                format!(
                    "must be after starts_at ({} >= {})",
                    self.starts_at.to_rfc3339(),
                    self.ends_at.to_rfc3339()
                ),
            ));
        }
        if let Some(label) = &self.label {
            check_text("label", label, limits.max_title_length)?;
        }
        Ok(())
    }

    /// Duration of the entry.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.ends_at - self.starts_at
    }
}

/// A course together with its derived assignment count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSummary {
    /// The course itself.
    #[serde(flatten)]
    pub course: Course,

    /// Number of assignments attached to the course.
    pub assignment_count: i64,
}

/// Parse a user-supplied timestamp.
///
/// Accepts RFC 3339 (`2025-09-01T09:00:00Z`) or a bare date (`2025-09-01`),
/// which is taken as midnight UTC.
///
/// # Errors
///
/// Returns [`Error::InvalidTimestamp`] if neither form matches.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(to_micros(dt.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::InvalidTimestamp {
            input: input.to_string(),
        })
}

fn to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

fn check_text(field: &'static str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(Error::validation(
            field,
            format!("is {len} characters, maximum is {max_len}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    #[test]
    fn test_user_new_trims() {
        let user = User::new("  alice ");
        assert_eq!(user.username, "alice");
        assert!(user.id.is_none());
    }

    #[test]
    fn test_user_validate_empty() {
        let err = User::new("   ").validate(&limits()).unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_course_new_trims() {
        let course = Course::new(1, " Linear Algebra ", " Fall 2025\n");
        assert_eq!(course.name, "Linear Algebra");
        assert_eq!(course.term, "Fall 2025");
        assert!(course.validate(&limits()).is_ok());
    }

    #[test]
    fn test_course_validate_empty_term() {
        let err = Course::new(1, "Physics", "").validate(&limits()).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "term", .. }));
    }

    #[test]
    fn test_course_validate_name_too_long() {
        let mut limits = limits();
        limits.max_name_length = 5;
        let err = Course::new(1, "Organic Chemistry", "Spring 2026")
            .validate(&limits)
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "name", .. }));
        assert!(err.to_string().contains("maximum is 5"));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let mut limits = limits();
        limits.max_name_length = 4;
        let course = Course::new(1, "数学入门", "秋季");
        assert!(course.validate(&limits).is_ok());
    }

    #[test]
    fn test_course_display() {
        let course = Course::new(1, "History", "Fall 2025");
        assert_eq!(course.to_string(), "History (Fall 2025)");
    }

    #[test]
    fn test_assignment_validate() {
        assert!(Assignment::new(1, "Problem set 1", None)
            .validate(&limits())
            .is_ok());
        assert!(Assignment::new(1, " ", None).validate(&limits()).is_err());
    }

    #[test]
    fn test_schedule_entry_requires_positive_range() {
        let start = Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap();
        let ok = ScheduleEntry::new(1, start, start + Duration::hours(1), Some("Lecture"));
        assert!(ok.validate(&limits()).is_ok());
        assert_eq!(ok.duration(), Duration::hours(1));

        let empty = ScheduleEntry::new(1, start, start, None);
        assert!(empty.validate(&limits()).is_err());

        let inverted = ScheduleEntry::new(1, start, start - Duration::hours(1), None);
        let err = inverted.validate(&limits()).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "ends_at", .. }));
    }

    #[test]
    fn test_sub_microsecond_range_is_empty() {
        let start = Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap();
        let entry = ScheduleEntry::new(1, start, start + Duration::nanoseconds(500), None);
        assert_eq!(entry.ends_at, entry.starts_at);
        assert!(entry.validate(&limits()).unwrap_err().is_validation());

        let mut raw = ScheduleEntry::new(1, start, start + Duration::hours(1), None);
        raw.ends_at = start + Duration::nanoseconds(999);
        assert!(raw.validate(&limits()).unwrap_err().is_validation());
    }

    #[test]
    fn test_timestamps_truncate_to_micros() {
        let due = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
            + Duration::nanoseconds(1_234_567);
        let assignment = Assignment::new(1, "Essay", Some(due));
        assert_eq!(assignment.due_at.unwrap().timestamp_subsec_nanos(), 1_234_000);
        assert_eq!(User::new("alice").created_at.timestamp_subsec_nanos() % 1_000, 0);

        let parsed = parse_timestamp("2025-10-01T12:00:00.001234567Z").unwrap();
        assert_eq!(parsed.timestamp_subsec_nanos(), 1_234_000);
    }

    #[test]
    fn test_schedule_entry_blank_label_is_none() {
        let start = Utc::now();
        let entry = ScheduleEntry::new(1, start, start + Duration::hours(1), Some("  "));
        assert!(entry.label.is_none());
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2025-09-01T09:30:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 9, 1, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_date_only() {
        let dt = parse_timestamp("2025-12-24").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 12, 24, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        let err = parse_timestamp("tomorrow").unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_course_serialize_skips_missing_id() {
        let json = serde_json::to_string(&Course::new(3, "Art", "Spring 2026")).unwrap();
        assert!(!json.contains("\"id\""));
        assert!(json.contains("\"user_id\":3"));
    }

    #[test]
    fn test_course_summary_serializes_flat() {
        let summary = CourseSummary {
            course: Course {
                id: Some(7),
                user_id: 1,
                name: "Biology".to_string(),
                term: "Fall 2025".to_string(),
            },
            assignment_count: 4,
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["name"], "Biology");
        assert_eq!(value["assignment_count"], 4);
    }
}
