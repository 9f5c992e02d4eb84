//! Fixed-duration slot availability within a daily working window.
//!
//! The working window is a pair of local wall-clock times anchored in the
//! venue timezone. Busy intervals are absolute instants, so both sides are
//! compared on the same timeline no matter which offset a calendar reported
//! them in. Candidate slots step through the window on absolute time; a slot
//! that would run past the close of the window is not generated.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::{self, DstPolicy};
use crate::error::{Result, SlotError};
use crate::interval::{self, BusyEntry};

/// A day's `[open, close)` bounds in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl WorkingWindow {
    /// Build a window, rejecting `open >= close`.
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self> {
        let window = Self { open, close };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<()> {
        if self.open >= self.close {
            return Err(SlotError::InvalidWindow {
                open: self.open,
                close: self.close,
            });
        }
        Ok(())
    }
}

/// How date-only (all-day) calendar entries affect availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllDayPolicy {
    /// All-day entries never block a slot.
    #[default]
    Ignore,
    /// An all-day entry covering the date blocks the whole window.
    BlockDay,
}

/// A bookable `[start, end)` range in the venue timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl Slot {
    /// Local wall-clock start time.
    pub fn start_time(&self) -> NaiveTime {
        self.start.time()
    }

    /// `HH:MM` label of the local start time.
    pub fn label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    pub fn duration_minutes(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_minutes()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Computes available slots for a venue.
///
/// Holds only immutable configuration; one instance can serve any number of
/// concurrent requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityCalculator {
    tz: Tz,
    all_day: AllDayPolicy,
    dst: DstPolicy,
}

impl AvailabilityCalculator {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            all_day: AllDayPolicy::default(),
            dst: DstPolicy::default(),
        }
    }

    pub fn with_all_day_policy(mut self, policy: AllDayPolicy) -> Self {
        self.all_day = policy;
        self
    }

    pub fn with_dst_policy(mut self, policy: DstPolicy) -> Self {
        self.dst = policy;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Anchor the window on `date` in the venue timezone.
    ///
    /// # Errors
    /// `InvalidWindow` if `open >= close`; `NonexistentLocalTime` if a bound
    /// falls in a DST gap under [`DstPolicy::Reject`].
    pub fn day_bounds(
        &self,
        date: NaiveDate,
        window: &WorkingWindow,
    ) -> Result<(DateTime<Tz>, DateTime<Tz>)> {
        window.validate()?;
        let open = dst::resolve_local(self.tz, date.and_time(window.open), self.dst)?;
        let close = dst::resolve_local(self.tz, date.and_time(window.close), self.dst)?;
        Ok((open, close))
    }

    /// Compute the chronologically ordered slots of `slot_minutes` on `date`
    /// that intersect no busy entry.
    ///
    /// `busy` may be unordered and overlapping. An empty result is not an
    /// error.
    ///
    /// # Errors
    /// `InvalidWindow` if `open >= close`, `InvalidDuration` if
    /// `slot_minutes <= 0`.
    pub fn compute_available_slots(
        &self,
        date: NaiveDate,
        window: &WorkingWindow,
        slot_minutes: i64,
        busy: &[BusyEntry],
    ) -> Result<Vec<Slot>> {
        window.validate()?;
        let step = slot_duration(slot_minutes)?;
        let (day_start, day_end) = self.day_bounds(date, window)?;

        if self.all_day == AllDayPolicy::BlockDay && busy.iter().any(|e| e.covers_date(date)) {
            tracing::debug!(%date, "all-day entry blocks the working window");
            return Ok(Vec::new());
        }

        let day_start = day_start.with_timezone(&Utc);
        let day_end = day_end.with_timezone(&Utc);
        let merged = interval::merge_intervals(
            busy.iter().filter_map(BusyEntry::as_interval),
            day_start,
            day_end,
        );

        let mut pending = merged.iter().peekable();
        let mut slots = Vec::new();
        let mut cursor = day_start;

        while let Some(candidate_end) = cursor
            .checked_add_signed(step)
            .filter(|end| *end <= day_end)
        {
            // Busy periods that ended by the cursor can no longer block.
            while pending.next_if(|(_, end)| *end <= cursor).is_some() {}

            let blocked = pending
                .peek()
                .is_some_and(|(start, end)| interval::overlaps(cursor, candidate_end, *start, *end));

            if !blocked {
                slots.push(Slot {
                    start: cursor.with_timezone(&self.tz),
                    end: candidate_end.with_timezone(&self.tz),
                });
            }

            cursor = candidate_end;
        }

        tracing::trace!(%date, slot_minutes, available = slots.len(), "computed availability");
        Ok(slots)
    }
}

fn slot_duration(minutes: i64) -> Result<Duration> {
    if minutes <= 0 {
        return Err(SlotError::InvalidDuration(minutes));
    }
    Duration::try_minutes(minutes).ok_or(SlotError::InvalidDuration(minutes))
}
