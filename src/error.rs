use rusqlite::Error as RusqliteError;
use std::io;
use thiserror::Error;

use crate::schedules::ScheduleConflict;

#[derive(Error, Debug)]
pub enum CarpoolError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] RusqliteError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Group name '{0}' already exists")]
    GroupExists(String),

    #[error("No schedule for group '{0}'")]
    ScheduleNotFound(String),

    // Boxed: the conflict carries the whole existing schedule
    #[error("{}", .0.message)]
    ScheduleActive(Box<ScheduleConflict>),

    #[error("On-demand request {0} not found")]
    RequestNotFound(i64),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Error: {0}")]
    Error(String),
}

impl CarpoolError {
    /// True for the expected, caller-facing outcomes (not found, conflict,
    /// bad input) as opposed to internal failures.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            CarpoolError::GroupNotFound(_)
                | CarpoolError::GroupExists(_)
                | CarpoolError::ScheduleNotFound(_)
                | CarpoolError::ScheduleActive(_)
                | CarpoolError::RequestNotFound(_)
                | CarpoolError::Invalid(_)
        )
    }
}
