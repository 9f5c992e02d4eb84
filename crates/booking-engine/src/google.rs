//! Google Calendar v3 JSON mapping.
//!
//! Converts `events.list` responses into [`BusyEntry`] values and builds the
//! bodies for `events.insert` / `events.update`. Transport and OAuth live in
//! whatever adapter implements [`CalendarService`](crate::CalendarService);
//! this module only knows the wire shape.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::calendar::{EventId, EventUpdate, NewEvent};
use crate::error::CalendarError;
use crate::interval::{BusyEntry, BusyInterval};

#[derive(Debug, Deserialize)]
struct EventsList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    transparency: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    end: Option<EventTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Map an `events.list` response body to busy entries.
///
/// - `dateTime` bounds become [`BusyEntry::Timed`], tagged with the event id.
/// - `date` bounds become [`BusyEntry::AllDay`]; a missing end date means one day.
/// - Cancelled and transparent (shown-as-free) events are skipped, as are
///   events with no usable start.
///
/// # Errors
/// [`CalendarError::MalformedResponse`] if the body is not JSON of the expected
/// shape or a timestamp/date cannot be parsed.
pub fn parse_events_list(body: &str) -> Result<Vec<BusyEntry>, CalendarError> {
    let list: EventsList = serde_json::from_str(body)?;
    let mut entries = Vec::with_capacity(list.items.len());

    for event in list.items {
        if event.status.as_deref() == Some("cancelled")
            || event.transparency.as_deref() == Some("transparent")
        {
            continue;
        }
        match to_entry(&event)? {
            Some(entry) => entries.push(entry),
            None => tracing::debug!(id = ?event.id, "skipping event without start time"),
        }
    }

    Ok(entries)
}

fn to_entry(event: &GoogleEvent) -> Result<Option<BusyEntry>, CalendarError> {
    let (Some(start), end) = (event.start.as_ref(), event.end.as_ref()) else {
        return Ok(None);
    };

    if let Some(start_str) = start.date_time.as_deref() {
        let end_str = end
            .and_then(|e| e.date_time.as_deref())
            .ok_or_else(|| malformed(event, "timed event without end.dateTime"))?;
        let interval = BusyInterval::new(parse_instant(start_str)?, parse_instant(end_str)?)
            .map_err(|e| CalendarError::MalformedResponse(e.to_string()))?;
        let interval = match &event.id {
            Some(id) => interval.with_event_id(EventId(id.clone())),
            None => interval,
        };
        return Ok(Some(BusyEntry::Timed(interval)));
    }

    if let Some(start_str) = start.date.as_deref() {
        let start_date = parse_date(start_str)?;
        let end_date = match end.and_then(|e| e.date.as_deref()) {
            Some(s) => parse_date(s)?,
            None => start_date + Duration::days(1),
        };
        return Ok(Some(BusyEntry::AllDay {
            start: start_date,
            end: end_date,
        }));
    }

    Ok(None)
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, CalendarError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CalendarError::MalformedResponse(format!("invalid dateTime '{}': {}", s, e)))
}

fn parse_date(s: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| CalendarError::MalformedResponse(format!("invalid date '{}': {}", s, e)))
}

fn malformed(event: &GoogleEvent, what: &str) -> CalendarError {
    CalendarError::MalformedResponse(format!(
        "{} (event {})",
        what,
        event.id.as_deref().unwrap_or("<no id>")
    ))
}

/// Body for `events.insert`.
///
/// Bounds carry both the offset-qualified timestamp and the IANA zone name so
/// the provider renders the event in the venue's local time.
pub fn event_body(event: &NewEvent) -> Value {
    let mut body = json!({
        "summary": event.summary,
        "description": event.description,
        "start": {
            "dateTime": event.start.to_rfc3339(),
            "timeZone": event.start.timezone().name(),
        },
        "end": {
            "dateTime": event.end.to_rfc3339(),
            "timeZone": event.end.timezone().name(),
        },
    });

    if !event.attendees.is_empty() {
        body["attendees"] = event
            .attendees
            .iter()
            .map(|email| json!({ "email": email }))
            .collect();
    }

    body
}

/// Apply `update` to an event body fetched from the provider, for
/// `events.update`. Fields not set in `update` are left as they are.
///
/// # Errors
/// [`CalendarError::MalformedResponse`] if the body or its `start`/`end`
/// members are not JSON objects.
pub fn apply_update(mut existing: Value, update: &EventUpdate) -> Result<Value, CalendarError> {
    let shape_ok = existing.is_object()
        && ["start", "end"]
            .iter()
            .all(|k| existing.get(k).is_none_or(|v| v.is_object() || v.is_null()));
    if !shape_ok {
        return Err(CalendarError::MalformedResponse(
            "event body is not an object with object start/end".to_string(),
        ));
    }

    if let Some(summary) = &update.summary {
        existing["summary"] = json!(summary);
    }
    if let Some(start) = &update.start {
        existing["start"]["dateTime"] = json!(start.to_rfc3339());
        existing["start"]["timeZone"] = json!(start.timezone().name());
    }
    if let Some(end) = &update.end {
        existing["end"]["dateTime"] = json!(end.to_rfc3339());
        existing["end"]["timeZone"] = json!(end.timezone().name());
    }
    Ok(existing)
}
