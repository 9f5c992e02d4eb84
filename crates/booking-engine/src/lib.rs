//! # booking-engine
//!
//! Availability and reservations for a personal training business.
//!
//! The core is [`AvailabilityCalculator`]: given a date, a working window, a
//! slot length and the busy intervals on a calendar, it returns the ordered
//! slots that intersect no busy interval. Window bounds are anchored in the
//! venue's IANA timezone and compared with busy intervals as absolute
//! instants, so a calendar reporting events in another offset cannot skew
//! the result.
//!
//! Around it, [`BookingService`] fetches busy entries from an injected
//! [`CalendarService`] and mirrors reservations as calendar events.
//!
//! ## Modules
//!
//! - [`availability`]: working window, slots, the calculator
//! - [`interval`]: busy intervals, half-open overlap, merging
//! - [`dst`]: local time resolution across DST transitions
//! - [`calendar`]: calendar collaborator trait and an in-memory calendar
//! - [`google`]: Google Calendar v3 JSON mapping
//! - [`booking`]: reserve, reschedule, cancel
//! - [`config`]: venue configuration (TOML)
//! - [`error`]: Error types

pub mod availability;
pub mod booking;
pub mod calendar;
pub mod config;
pub mod dst;
pub mod error;
pub mod google;
pub mod interval;

pub use availability::{AllDayPolicy, AvailabilityCalculator, Slot, WorkingWindow};
pub use booking::{BookingService, Client, Reservation, ReservationRequest};
pub use calendar::{CalendarService, EventId, EventUpdate, InMemoryCalendar, NewEvent};
pub use config::{FetchFailurePolicy, Venue, VenueConfig};
pub use dst::DstPolicy;
pub use error::{BookingError, CalendarError, ConfigError, SlotError};
pub use interval::{BusyEntry, BusyInterval};
