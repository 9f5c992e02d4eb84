//! Reservation workflow on top of the availability calculator and an injected
//! calendar service.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::availability::Slot;
use crate::calendar::{CalendarService, EventId, EventUpdate, NewEvent};
use crate::config::{FetchFailurePolicy, Venue};
use crate::error::{BookingError, CalendarError, SlotError};
use crate::interval::BusyEntry;

/// The person booking a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// What a client submits when booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub date: NaiveDate,
    /// Local start time; must match the start of an available slot.
    pub time: NaiveTime,
    pub location: String,
    #[serde(default)]
    pub training_type: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub client: Client,
}

/// A booked training session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub location: String,
    pub training_type: Option<String>,
    pub phone: String,
    pub notes: Option<String>,
    pub client: Client,
    /// Id of the mirrored calendar event.
    pub calendar_event_id: Option<EventId>,
    pub completed: bool,
}

impl Reservation {
    fn from_request(request: &ReservationRequest, event_id: EventId) -> Self {
        Self {
            date: request.date,
            time: request.time,
            location: request.location.clone(),
            training_type: request.training_type.clone(),
            phone: request.phone.clone(),
            notes: request.notes.clone(),
            client: request.client.clone(),
            calendar_event_id: Some(event_id),
            completed: false,
        }
    }
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Session for {} on {} at {}",
            self.client.username,
            self.date,
            self.time.format("%H:%M")
        )
    }
}

/// Summary of the calendar event mirroring a reservation.
pub fn event_summary(training_type: Option<&str>) -> String {
    match training_type {
        Some(kind) if !kind.trim().is_empty() => format!("Training: {}", kind.trim()),
        _ => "Training (unspecified)".to_string(),
    }
}

/// Lists availability and keeps reservations mirrored on a calendar.
pub struct BookingService<C> {
    calendar: C,
    venue: Venue,
}

impl<C: CalendarService> BookingService<C> {
    pub fn new(calendar: C, venue: Venue) -> Self {
        Self { calendar, venue }
    }

    pub fn venue(&self) -> &Venue {
        &self.venue
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Available slots on `date`, applying the venue's fetch-failure policy
    /// when the calendar cannot be reached.
    pub fn available_slots(&self, date: NaiveDate) -> Result<Vec<Slot>, BookingError> {
        self.slots_excluding(date, None)
    }

    /// Book the slot starting at `request.time` and mirror it on the calendar.
    ///
    /// # Errors
    /// `SlotUnavailable` if no available slot starts at the requested time,
    /// or if a session of `session_minutes` from there would run past the
    /// close of the window or into a busy entry. Calendar errors from fetching (under [`FetchFailurePolicy::Fail`]) or
    /// from creating the event.
    pub fn reserve(&self, request: &ReservationRequest) -> Result<Reservation, BookingError> {
        let (start, end) = self.find_session(request.date, request.time, None)?;
        let event = NewEvent {
            summary: event_summary(request.training_type.as_deref()),
            description: format!("Reservation for: {}", request.client.username),
            start,
            end,
            attendees: request.client.email.iter().cloned().collect(),
        };

        let event_id = self.calendar.create_event(&self.venue.calendar_id, &event)?;
        tracing::info!(
            date = %request.date,
            time = %request.time,
            user = %request.client.username,
            %event_id,
            "reservation created"
        );
        Ok(Reservation::from_request(request, event_id))
    }

    /// Move `reservation` to `date` at `time`.
    ///
    /// The reservation's own calendar event does not block the new slot. If
    /// that event has disappeared from the calendar, a fresh one is created.
    pub fn reschedule(
        &self,
        reservation: &Reservation,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Reservation, BookingError> {
        let own = reservation.calendar_event_id.as_ref();
        let (start, end) = self.find_session(date, time, own)?;
        let summary = event_summary(reservation.training_type.as_deref());

        let event_id = match own {
            Some(id) => {
                let update = EventUpdate {
                    summary: Some(summary.clone()),
                    start: Some(start),
                    end: Some(end),
                };
                match self.calendar.update_event(&self.venue.calendar_id, id, &update) {
                    Ok(()) => id.clone(),
                    Err(CalendarError::EventNotFound(_)) => {
                        tracing::warn!(%id, "calendar event missing; recreating it");
                        self.create_for(reservation, summary, start, end)?
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            None => self.create_for(reservation, summary, start, end)?,
        };

        tracing::info!(%date, %time, user = %reservation.client.username, %event_id, "reservation rescheduled");
        Ok(Reservation {
            date,
            time,
            calendar_event_id: Some(event_id),
            ..reservation.clone()
        })
    }

    /// Remove the reservation's calendar event. An event that is already
    /// gone counts as cancelled.
    pub fn cancel(&self, reservation: &Reservation) -> Result<(), BookingError> {
        let Some(id) = &reservation.calendar_event_id else {
            return Ok(());
        };
        match self.calendar.delete_event(&self.venue.calendar_id, id) {
            Ok(()) => {
                tracing::info!(%id, user = %reservation.client.username, "reservation cancelled");
                Ok(())
            }
            Err(CalendarError::EventNotFound(_)) => {
                tracing::warn!(%id, "calendar event already deleted");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn create_for(
        &self,
        reservation: &Reservation,
        summary: String,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<EventId, CalendarError> {
        let event = NewEvent {
            summary,
            description: format!("Reservation for: {}", reservation.client.username),
            start,
            end,
            attendees: reservation.client.email.iter().cloned().collect(),
        };
        self.calendar.create_event(&self.venue.calendar_id, &event)
    }

    fn session_end(&self, start: DateTime<Tz>) -> Result<DateTime<Tz>, SlotError> {
        let minutes = self.venue.session_minutes;
        Duration::try_minutes(minutes)
            .filter(|_| minutes > 0)
            .and_then(|d| start.checked_add_signed(d))
            .ok_or(SlotError::InvalidDuration(minutes))
    }

    /// Locate the available slot starting at `time` and check that a whole
    /// session from there stays inside the window and clear of busy entries.
    fn find_session(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        ignore: Option<&EventId>,
    ) -> Result<(DateTime<Tz>, DateTime<Tz>), BookingError> {
        let unavailable = BookingError::SlotUnavailable { date, time };
        let Some(day) = self.busy_for_day(date, ignore)? else {
            return Err(unavailable);
        };
        let slot = self
            .slots_for(date, &day.busy)?
            .into_iter()
            .find(|slot| slot.start_time() == time)
            .ok_or(BookingError::SlotUnavailable { date, time })?;

        let start = slot.start;
        let end = self.session_end(start)?;
        let (start_utc, end_utc) = (start.with_timezone(&Utc), end.with_timezone(&Utc));
        let clashes = day
            .busy
            .iter()
            .filter_map(BusyEntry::as_interval)
            .any(|busy| busy.overlaps(start_utc, end_utc));
        if end > day.close || clashes {
            tracing::debug!(%date, %time, %end, clashes, "session does not fit");
            return Err(unavailable);
        }
        Ok((start, end))
    }

    fn slots_excluding(
        &self,
        date: NaiveDate,
        ignore: Option<&EventId>,
    ) -> Result<Vec<Slot>, BookingError> {
        match self.busy_for_day(date, ignore)? {
            Some(day) => self.slots_for(date, &day.busy),
            None => Ok(Vec::new()),
        }
    }

    fn slots_for(&self, date: NaiveDate, busy: &[BusyEntry]) -> Result<Vec<Slot>, BookingError> {
        Ok(self.venue.calculator().compute_available_slots(
            date,
            &self.venue.window,
            self.venue.slot_minutes,
            busy,
        )?)
    }

    /// Busy entries for the working window on `date`, minus the event
    /// `ignore`. `None` means the calendar was unreachable and the venue
    /// treats that as a fully booked day.
    fn busy_for_day(
        &self,
        date: NaiveDate,
        ignore: Option<&EventId>,
    ) -> Result<Option<DayBusy>, BookingError> {
        let (open, close) = self.venue.calculator().day_bounds(date, &self.venue.window)?;
        let busy = match self.fetch_busy(open.with_timezone(&Utc), close.with_timezone(&Utc)) {
            Ok(busy) => busy,
            Err(err) => match self.venue.on_calendar_failure {
                FetchFailurePolicy::Fail => return Err(err.into()),
                FetchFailurePolicy::AssumeBusy => {
                    tracing::warn!(%date, error = %err, "calendar unreachable; offering no slots");
                    return Ok(None);
                }
                FetchFailurePolicy::AssumeFree => {
                    tracing::warn!(%date, error = %err, "calendar unreachable; treating day as free");
                    Vec::new()
                }
            },
        };

        let busy = match ignore {
            Some(id) => busy
                .into_iter()
                .filter(|entry| entry.event_id() != Some(id))
                .collect(),
            None => busy,
        };
        Ok(Some(DayBusy { close, busy }))
    }

    fn fetch_busy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BusyEntry>, CalendarError> {
        self.calendar.list_busy(&self.venue.calendar_id, start, end)
    }
}

struct DayBusy {
    close: DateTime<Tz>,
    busy: Vec<BusyEntry>,
}
