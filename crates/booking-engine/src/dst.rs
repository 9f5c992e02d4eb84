//! Resolving local wall-clock times to instants across DST transitions.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};

/// Longest DST gap we search across when shifting forward.
const MAX_GAP_MINUTES: i64 = 180;

/// Policy for a local time that falls in a DST gap (e.g. 02:30 on a
/// spring-forward night).
///
/// Ambiguous local times (the repeated hour on a fall-back night) always
/// resolve to the earliest instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Use the first valid local minute after the gap.
    #[default]
    ShiftForward,
    /// Fail with [`SlotError::NonexistentLocalTime`].
    Reject,
}

/// Attach `tz` to a naive local datetime according to `policy`.
pub fn resolve_local(tz: Tz, local: NaiveDateTime, policy: DstPolicy) -> Result<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => match policy {
            DstPolicy::Reject => Err(SlotError::NonexistentLocalTime(local)),
            DstPolicy::ShiftForward => (1..=MAX_GAP_MINUTES)
                .find_map(|m| match tz.from_local_datetime(&(local + Duration::minutes(m))) {
                    LocalResult::Single(dt) => Some(dt),
                    LocalResult::Ambiguous(earliest, _) => Some(earliest),
                    LocalResult::None => None,
                })
                .ok_or(SlotError::NonexistentLocalTime(local)),
        },
    }
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse()
        .map_err(|_| SlotError::InvalidTimezone(name.to_string()))
}
