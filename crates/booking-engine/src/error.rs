//! Error types for booking-engine operations.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Errors from the pure availability computation. These are caller mistakes
/// and are never worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Invalid working window: open {open} is not before close {close}")]
    InvalidWindow { open: NaiveTime, close: NaiveTime },

    #[error("Invalid slot duration: {0} minutes")]
    InvalidDuration(i64),

    #[error("Invalid busy interval: start {start} is not before end {end}")]
    InvalidInterval { start: String, end: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Local time {0} does not exist in the venue timezone")]
    NonexistentLocalTime(NaiveDateTime),
}

/// Failures reported by a calendar collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Network, auth or provider failure. Callers decide how to degrade.
    #[error("Calendar unavailable: {0}")]
    Unavailable(String),

    #[error("Calendar event not found: {0}")]
    EventNotFound(String),

    /// The provider answered with a payload we could not map.
    #[error("Malformed calendar response: {0}")]
    MalformedResponse(String),
}

impl From<serde_json::Error> for CalendarError {
    fn from(err: serde_json::Error) -> Self {
        CalendarError::MalformedResponse(err.to_string())
    }
}

/// Errors from loading or resolving a venue configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid time of day for `{field}`: {value:?} (expected HH:MM)")]
    InvalidTime { field: &'static str, value: String },

    #[error("`{field}` must be a positive number of minutes, got {value}")]
    InvalidMinutes { field: &'static str, value: i64 },

    #[error(transparent)]
    Invalid(#[from] SlotError),
}

/// Errors from the reservation workflow.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error("No available slot starts at {time} on {date}")]
    SlotUnavailable { date: NaiveDate, time: NaiveTime },
}

/// Convenience alias used by the availability modules.
pub type Result<T> = std::result::Result<T, SlotError>;
