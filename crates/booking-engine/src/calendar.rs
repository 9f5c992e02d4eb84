//! The calendar collaborator: the narrow interface the booking workflow needs
//! from an external calendar provider, plus an in-memory implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;
use crate::interval::{BusyEntry, BusyInterval};

/// Provider-assigned identifier of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

/// An event to create on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    /// Attendee email addresses.
    pub attendees: Vec<String>,
}

/// Fields to change on an existing event. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventUpdate {
    pub summary: Option<String>,
    pub start: Option<DateTime<Tz>>,
    pub end: Option<DateTime<Tz>>,
}

/// External calendar service.
///
/// Implementations own their authentication lifecycle and are constructed
/// once, then shared with whatever needs them.
pub trait CalendarService: Send + Sync {
    /// Busy entries overlapping `[range_start, range_end)`.
    fn list_busy(
        &self,
        calendar_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyEntry>, CalendarError>;

    fn create_event(&self, calendar_id: &str, event: &NewEvent) -> Result<EventId, CalendarError>;

    fn update_event(
        &self,
        calendar_id: &str,
        id: &EventId,
        update: &EventUpdate,
    ) -> Result<(), CalendarError>;

    fn delete_event(&self, calendar_id: &str, id: &EventId) -> Result<(), CalendarError>;
}

impl<T: CalendarService + ?Sized> CalendarService for Arc<T> {
    fn list_busy(
        &self,
        calendar_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyEntry>, CalendarError> {
        (**self).list_busy(calendar_id, range_start, range_end)
    }

    fn create_event(&self, calendar_id: &str, event: &NewEvent) -> Result<EventId, CalendarError> {
        (**self).create_event(calendar_id, event)
    }

    fn update_event(
        &self,
        calendar_id: &str,
        id: &EventId,
        update: &EventUpdate,
    ) -> Result<(), CalendarError> {
        (**self).update_event(calendar_id, id, update)
    }

    fn delete_event(&self, calendar_id: &str, id: &EventId) -> Result<(), CalendarError> {
        (**self).delete_event(calendar_id, id)
    }
}

#[derive(Debug, Clone)]
struct StoredEvent {
    calendar_id: String,
    event: NewEvent,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    events: BTreeMap<EventId, StoredEvent>,
    /// Entries not created through this service (other commitments).
    external: Vec<(String, BusyEntry)>,
    offline: bool,
}

/// Calendar kept entirely in memory.
///
/// Created events show up as busy intervals tagged with their id. Toggling
/// [`InMemoryCalendar::set_offline`] makes every call fail with
/// [`CalendarError::Unavailable`]. All-day entries are dated in the
/// calendar's timezone (UTC unless set with [`InMemoryCalendar::in_timezone`]).
#[derive(Debug)]
pub struct InMemoryCalendar {
    state: Mutex<State>,
    tz: Tz,
}

impl Default for InMemoryCalendar {
    fn default() -> Self {
        Self {
            state: Mutex::default(),
            tz: Tz::UTC,
        }
    }
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Date all-day entries in `tz` when matching them against a range.
    pub fn in_timezone(mut self, tz: Tz) -> Self {
        self.tz = tz;
        self
    }

    /// Seed a calendar with externally scheduled entries.
    pub fn with_entries(calendar_id: &str, entries: impl IntoIterator<Item = BusyEntry>) -> Self {
        let calendar = Self::new();
        if let Ok(mut state) = calendar.state.lock() {
            state
                .external
                .extend(entries.into_iter().map(|e| (calendar_id.to_string(), e)));
        }
        calendar
    }

    pub fn add_entry(&self, calendar_id: &str, entry: BusyEntry) -> Result<(), CalendarError> {
        self.lock()?.external.push((calendar_id.to_string(), entry));
        Ok(())
    }

    pub fn set_offline(&self, offline: bool) {
        // The flag must flip even if a previous holder panicked.
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.offline = offline;
    }

    /// Snapshot of an event created through this service.
    pub fn event(&self, id: &EventId) -> Option<NewEvent> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.events.get(id).map(|stored| stored.event.clone()))
    }

    /// Number of events created through this service and not yet deleted.
    pub fn event_count(&self) -> usize {
        self.state.lock().map(|state| state.events.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, CalendarError> {
        self.state
            .lock()
            .map_err(|_| CalendarError::Unavailable("calendar state poisoned".to_string()))
    }

    fn online(&self) -> Result<MutexGuard<'_, State>, CalendarError> {
        let state = self.lock()?;
        if state.offline {
            return Err(CalendarError::Unavailable("calendar is offline".to_string()));
        }
        Ok(state)
    }
}

fn entry_overlaps(
    entry: &BusyEntry,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    tz: Tz,
) -> bool {
    match entry {
        BusyEntry::Timed(interval) => interval.overlaps(range_start, range_end),
        BusyEntry::AllDay { start, end } => {
            if range_start >= range_end {
                return false;
            }
            // Local dates touched by the half-open range.
            let first: NaiveDate = range_start.with_timezone(&tz).date_naive();
            let last: NaiveDate = range_end
                .checked_sub_signed(Duration::nanoseconds(1))
                .unwrap_or(range_end)
                .with_timezone(&tz)
                .date_naive();
            *start <= last && first < *end
        }
    }
}

impl CalendarService for InMemoryCalendar {
    fn list_busy(
        &self,
        calendar_id: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyEntry>, CalendarError> {
        let state = self.online()?;

        let external = state
            .external
            .iter()
            .filter(|(cal, entry)| {
                cal == calendar_id && entry_overlaps(entry, range_start, range_end, self.tz)
            })
            .map(|(_, entry)| entry.clone());

        let created = state
            .events
            .iter()
            .filter(|(_, stored)| stored.calendar_id == calendar_id)
            .filter_map(|(id, stored)| {
                BusyInterval::new(
                    stored.event.start.with_timezone(&Utc),
                    stored.event.end.with_timezone(&Utc),
                )
                .ok()
                .map(|interval| interval.with_event_id(id.clone()))
            })
            .filter(|interval| interval.overlaps(range_start, range_end))
            .map(BusyEntry::Timed);

        Ok(external.chain(created).collect())
    }

    fn create_event(&self, calendar_id: &str, event: &NewEvent) -> Result<EventId, CalendarError> {
        let mut state = self.online()?;
        state.next_id += 1;
        let id = EventId(format!("evt-{}", state.next_id));
        state.events.insert(
            id.clone(),
            StoredEvent {
                calendar_id: calendar_id.to_string(),
                event: event.clone(),
            },
        );
        tracing::debug!(%id, calendar_id, summary = %event.summary, "created calendar event");
        Ok(id)
    }

    fn update_event(
        &self,
        calendar_id: &str,
        id: &EventId,
        update: &EventUpdate,
    ) -> Result<(), CalendarError> {
        let mut state = self.online()?;
        let stored = state
            .events
            .get_mut(id)
            .filter(|stored| stored.calendar_id == calendar_id)
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;

        if let Some(summary) = &update.summary {
            stored.event.summary = summary.clone();
        }
        if let Some(start) = update.start {
            stored.event.start = start;
        }
        if let Some(end) = update.end {
            stored.event.end = end;
        }
        Ok(())
    }

    fn delete_event(&self, calendar_id: &str, id: &EventId) -> Result<(), CalendarError> {
        let mut state = self.online()?;
        let owned = state
            .events
            .get(id)
            .is_some_and(|stored| stored.calendar_id == calendar_id);
        if !owned {
            return Err(CalendarError::EventNotFound(id.to_string()));
        }
        state.events.remove(id);
        tracing::debug!(%id, calendar_id, "deleted calendar event");
        Ok(())
    }
}
