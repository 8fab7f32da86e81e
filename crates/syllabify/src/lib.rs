//! `syllabify` - course, assignment and schedule tracking
//!
//! This library provides the relational data model behind a course tracker:
//! users own courses for a given academic term, and each course carries its
//! assignments and schedule entries. Everything is persisted in `SQLite`.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{Assignment, Course, CourseSummary, ScheduleEntry, User};
pub use storage::{Storage, StorageStats};
