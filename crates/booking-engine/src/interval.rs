//! Busy intervals and half-open interval arithmetic.
//!
//! Every interval here is `[start, end)`: an interval ending exactly when
//! another starts does NOT overlap it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::EventId;
use crate::error::{Result, SlotError};

/// One externally scheduled event occupying `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Calendar event that produced this interval, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}

impl BusyInterval {
    /// Build an interval, rejecting empty or inverted ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(SlotError::InvalidInterval {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self {
            start,
            end,
            event_id: None,
        })
    }

    /// Tag the interval with the calendar event it came from.
    pub fn with_event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        overlaps(self.start, self.end, start, end)
    }
}

/// An entry returned by a calendar: either a concrete interval or a date-only
/// (all-day) event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusyEntry {
    Timed(BusyInterval),
    /// Date-only event covering `[start, end)` in days.
    AllDay { start: NaiveDate, end: NaiveDate },
}

impl BusyEntry {
    pub fn as_interval(&self) -> Option<&BusyInterval> {
        match self {
            BusyEntry::Timed(interval) => Some(interval),
            BusyEntry::AllDay { .. } => None,
        }
    }

    /// Whether an all-day entry covers `date`. Timed entries never do.
    pub fn covers_date(&self, date: NaiveDate) -> bool {
        match self {
            BusyEntry::Timed(_) => false,
            BusyEntry::AllDay { start, end } => *start <= date && date < *end,
        }
    }

    /// Event id of a timed entry, if any.
    pub fn event_id(&self) -> Option<&EventId> {
        self.as_interval().and_then(|i| i.event_id.as_ref())
    }
}

impl From<BusyInterval> for BusyEntry {
    fn from(interval: BusyInterval) -> Self {
        BusyEntry::Timed(interval)
    }
}

/// Half-open overlap test: `max(a_start, b_start) < min(a_end, b_end)`.
pub fn overlaps<T: Ord + Copy>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start.max(b_start) < a_end.min(b_end)
}

/// Clip intervals to `[window_start, window_end)`, then merge overlapping or
/// adjacent ones.
///
/// Returns a sorted, non-overlapping list of `(start, end)` pairs. Intervals
/// entirely outside the window (including ones touching its edges) are
/// dropped.
pub fn merge_intervals<'a, I>(
    intervals: I,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)>
where
    I: IntoIterator<Item = &'a BusyInterval>,
{
    let mut clipped: Vec<(DateTime<Utc>, DateTime<Utc>)> = intervals
        .into_iter()
        .filter(|i| i.overlaps(window_start, window_end))
        .map(|i| (i.start.max(window_start), i.end.min(window_end)))
        .collect();

    if clipped.is_empty() {
        return Vec::new();
    }

    clipped.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(clipped.len());
    for (start, end) in clipped {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }

    merged
}
