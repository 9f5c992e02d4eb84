//! Venue configuration, loaded from TOML.
//!
//! ```toml
//! timezone = "America/Bogota"
//! calendar_id = "primary"
//! open = "08:00"
//! close = "20:00"
//! slot_minutes = 60
//! session_minutes = 60
//! all_day_events = "ignore"        # or "block_day"
//! on_calendar_failure = "assume_busy"  # or "assume_free", "fail"
//! dst = "shift_forward"            # or "reject"
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::path::Path;

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::{AllDayPolicy, AvailabilityCalculator, WorkingWindow};
use crate::dst::{self, DstPolicy};
use crate::error::ConfigError;

/// What to do when busy entries cannot be fetched from the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailurePolicy {
    /// Offer no slots for the day.
    #[default]
    AssumeBusy,
    /// Offer every slot in the window.
    AssumeFree,
    /// Return the calendar error to the caller.
    Fail,
}

/// Raw, serializable venue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VenueConfig {
    /// IANA timezone of the venue.
    pub timezone: String,
    pub calendar_id: String,
    /// Opening time, `HH:MM`.
    pub open: String,
    /// Closing time, `HH:MM`.
    pub close: String,
    pub slot_minutes: i64,
    /// Length of the calendar event created for a reservation.
    pub session_minutes: i64,
    pub all_day_events: AllDayPolicy,
    pub on_calendar_failure: FetchFailurePolicy,
    /// Handling of window bounds that fall in a DST gap.
    pub dst: DstPolicy,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Bogota".to_string(),
            calendar_id: "primary".to_string(),
            open: "08:00".to_string(),
            close: "20:00".to_string(),
            slot_minutes: 60,
            session_minutes: 60,
            all_day_events: AllDayPolicy::Ignore,
            on_calendar_failure: FetchFailurePolicy::AssumeBusy,
            dst: DstPolicy::ShiftForward,
        }
    }
}

impl VenueConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Validate every field and produce a [`Venue`].
    pub fn resolve(&self) -> Result<Venue, ConfigError> {
        let tz = dst::parse_timezone(&self.timezone)?;
        let window = WorkingWindow::new(
            parse_time("open", &self.open)?,
            parse_time("close", &self.close)?,
        )?;
        positive("slot_minutes", self.slot_minutes)?;
        positive("session_minutes", self.session_minutes)?;

        Ok(Venue {
            tz,
            calendar_id: self.calendar_id.clone(),
            window,
            slot_minutes: self.slot_minutes,
            session_minutes: self.session_minutes,
            all_day_events: self.all_day_events,
            on_calendar_failure: self.on_calendar_failure,
            dst: self.dst,
        })
    }
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ConfigError::InvalidTime {
        field,
        value: value.to_string(),
    })
}

fn positive(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if value <= 0 {
        return Err(ConfigError::InvalidMinutes { field, value });
    }
    Ok(())
}

/// Validated venue settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Venue {
    pub tz: Tz,
    pub calendar_id: String,
    pub window: WorkingWindow,
    pub slot_minutes: i64,
    pub session_minutes: i64,
    pub all_day_events: AllDayPolicy,
    pub on_calendar_failure: FetchFailurePolicy,
    pub dst: DstPolicy,
}

impl Venue {
    pub fn calculator(&self) -> AvailabilityCalculator {
        AvailabilityCalculator::new(self.tz)
            .with_all_day_policy(self.all_day_events)
            .with_dst_policy(self.dst)
    }
}
