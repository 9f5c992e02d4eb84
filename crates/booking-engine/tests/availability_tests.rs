//! Tests for fixed-duration slot availability.

use booking_engine::{
    AllDayPolicy, AvailabilityCalculator, BusyEntry, BusyInterval, Slot, SlotError, WorkingWindow,
};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::Bogota;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 16).unwrap()
}

fn t(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap()
}

fn window(open_hour: u32, close_hour: u32) -> WorkingWindow {
    WorkingWindow::new(t(open_hour, 0), t(close_hour, 0)).unwrap()
}

/// Busy interval on the test day, given in Bogota wall-clock time.
fn busy(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> BusyEntry {
    let start = Bogota
        .with_ymd_and_hms(2026, 3, 16, start_hour, start_min, 0)
        .unwrap()
        .with_timezone(&Utc);
    let end = Bogota
        .with_ymd_and_hms(2026, 3, 16, end_hour, end_min, 0)
        .unwrap()
        .with_timezone(&Utc);
    BusyInterval::new(start, end).unwrap().into()
}

fn labels(slots: &[Slot]) -> Vec<String> {
    slots.iter().map(Slot::label).collect()
}

fn calculator() -> AvailabilityCalculator {
    AvailabilityCalculator::new(Bogota)
}

// ── Full partition ──────────────────────────────────────────────────────────

#[test]
fn no_busy_intervals_partition_the_whole_window() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[])
        .unwrap();

    assert_eq!(slots.len(), 12);
    assert_eq!(
        labels(&slots),
        vec![
            "08:00", "09:00", "10:00", "11:00", "12:00", "13:00", "14:00", "15:00", "16:00",
            "17:00", "18:00", "19:00"
        ]
    );
    assert!(slots.iter().all(|s| s.duration_minutes() == 60));
    assert_eq!(slots.last().unwrap().end.time(), t(20, 0));
}

#[test]
fn slots_carry_the_venue_timezone() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[])
        .unwrap();

    assert_eq!(slots[0].start.timezone(), Bogota);
    assert_eq!(slots[0].start.to_rfc3339(), "2026-03-16T08:00:00-05:00");
    assert_eq!(slots[0].to_string(), "08:00-09:00");
    assert_eq!(slots[0].start_time(), t(8, 0));
}

// ── Busy intervals ──────────────────────────────────────────────────────────

#[test]
fn one_hour_busy_excludes_only_that_slot() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[busy(9, 0, 10, 0)])
        .unwrap();

    let got = labels(&slots);
    assert_eq!(got.len(), 11);
    assert!(got.contains(&"08:00".to_string()));
    assert!(!got.contains(&"09:00".to_string()));
    for hour in 10..20 {
        assert!(got.contains(&format!("{:02}:00", hour)), "missing {hour}:00");
    }
}

#[test]
fn touching_boundaries_do_not_block() {
    let entries = [busy(7, 0, 8, 0), busy(20, 0, 21, 0)];

    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &entries)
        .unwrap();

    assert_eq!(slots.len(), 12);
}

#[test]
fn partial_overlap_blocks_the_slot() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[busy(10, 30, 10, 45)])
        .unwrap();

    let got = labels(&slots);
    assert_eq!(got.len(), 11);
    assert!(!got.contains(&"10:00".to_string()));
}

#[test]
fn busy_interval_spanning_two_slots_blocks_both() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[busy(10, 30, 11, 30)])
        .unwrap();

    let got = labels(&slots);
    assert_eq!(got.len(), 10);
    assert!(!got.contains(&"10:00".to_string()));
    assert!(!got.contains(&"11:00".to_string()));
}

#[test]
fn unordered_and_overlapping_busy_intervals() {
    let entries = [
        busy(13, 0, 15, 0),
        busy(9, 0, 10, 30),
        busy(14, 0, 14, 30),
    ];

    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &entries)
        .unwrap();

    assert_eq!(
        labels(&slots),
        vec!["08:00", "11:00", "12:00", "15:00", "16:00", "17:00", "18:00", "19:00"]
    );
}

#[test]
fn busy_interval_reported_in_another_offset() {
    // 14:00Z is 09:00 in Bogota.
    let start: DateTime<Utc> = "2026-03-16T14:00:00Z".parse().unwrap();
    let end: DateTime<Utc> = "2026-03-16T15:00:00Z".parse().unwrap();
    let entry: BusyEntry = BusyInterval::new(start, end).unwrap().into();

    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[entry])
        .unwrap();

    assert!(!labels(&slots).contains(&"09:00".to_string()));
    assert_eq!(slots.len(), 11);
}

#[test]
fn busy_covering_the_window_leaves_nothing() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[busy(8, 0, 20, 0)])
        .unwrap();

    assert!(slots.is_empty());
}

#[test]
fn busy_on_another_day_is_irrelevant() {
    let start = Bogota.with_ymd_and_hms(2026, 3, 17, 9, 0, 0).unwrap();
    let entry: BusyEntry = BusyInterval::new(
        start.with_timezone(&Utc),
        (start + chrono::Duration::hours(1)).with_timezone(&Utc),
    )
    .unwrap()
    .into();

    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[entry])
        .unwrap();

    assert_eq!(slots.len(), 12);
}

// ── Durations that do not divide the window ─────────────────────────────────

#[test]
fn ninety_minute_slots_end_inside_the_window() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 90, &[])
        .unwrap();

    assert_eq!(
        labels(&slots),
        vec!["08:00", "09:30", "11:00", "12:30", "14:00", "15:30", "17:00", "18:30"]
    );
    assert_eq!(slots.last().unwrap().end.time(), t(20, 0));
}

#[test]
fn remainder_shorter_than_a_slot_is_not_offered() {
    // 720 / 50 = 14 full slots, 20 minutes left over.
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 50, &[])
        .unwrap();

    assert_eq!(slots.len(), 14);
    let last = slots.last().unwrap();
    assert_eq!(last.label(), "18:50");
    assert_eq!(last.end.time(), t(19, 40));
}

#[test]
fn slot_longer_than_window_yields_no_slots() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 9), 90, &[])
        .unwrap();

    assert!(slots.is_empty());
}

// ── All-day entries ─────────────────────────────────────────────────────────

fn all_day(start_day: u32, end_day: u32) -> BusyEntry {
    BusyEntry::AllDay {
        start: NaiveDate::from_ymd_opt(2026, 3, start_day).unwrap(),
        end: NaiveDate::from_ymd_opt(2026, 3, end_day).unwrap(),
    }
}

#[test]
fn all_day_entries_are_ignored_by_default() {
    let slots = calculator()
        .compute_available_slots(day(), &window(8, 20), 60, &[all_day(16, 17)])
        .unwrap();

    assert_eq!(slots.len(), 12);
}

#[test]
fn block_day_policy_empties_a_covered_date() {
    let calc = calculator().with_all_day_policy(AllDayPolicy::BlockDay);

    let covered = calc
        .compute_available_slots(day(), &window(8, 20), 60, &[all_day(15, 18)])
        .unwrap();
    assert!(covered.is_empty());

    // End date is exclusive.
    let ended = calc
        .compute_available_slots(day(), &window(8, 20), 60, &[all_day(15, 16)])
        .unwrap();
    assert_eq!(ended.len(), 12);
}

#[test]
fn block_day_policy_still_honours_timed_entries() {
    let calc = calculator().with_all_day_policy(AllDayPolicy::BlockDay);
    let slots = calc
        .compute_available_slots(
            day(),
            &window(8, 20),
            60,
            &[all_day(17, 18), busy(9, 0, 10, 0)],
        )
        .unwrap();

    assert_eq!(slots.len(), 11);
}

// ── Invalid input ───────────────────────────────────────────────────────────

#[test]
fn open_not_before_close_is_invalid_window() {
    let same = WorkingWindow {
        open: t(8, 0),
        close: t(8, 0),
    };
    let inverted = WorkingWindow {
        open: t(20, 0),
        close: t(8, 0),
    };

    for w in [same, inverted] {
        let err = calculator()
            .compute_available_slots(day(), &w, 60, &[])
            .unwrap_err();
        assert!(matches!(err, SlotError::InvalidWindow { .. }), "got {err:?}");
    }
    assert!(WorkingWindow::new(t(9, 0), t(9, 0)).is_err());
}

#[test]
fn non_positive_duration_is_invalid() {
    for minutes in [0, -30] {
        let err = calculator()
            .compute_available_slots(day(), &window(8, 20), minutes, &[])
            .unwrap_err();
        assert_eq!(err, SlotError::InvalidDuration(minutes));
    }
}

#[test]
fn oversized_duration_is_invalid() {
    let err = calculator()
        .compute_available_slots(day(), &window(8, 20), i64::MAX, &[])
        .unwrap_err();
    assert_eq!(err, SlotError::InvalidDuration(i64::MAX));
}

// ── Purity ──────────────────────────────────────────────────────────────────

#[test]
fn identical_input_gives_identical_output() {
    let entries = [busy(9, 0, 10, 0), busy(15, 15, 16, 45)];
    let calc = calculator();

    let first = calc
        .compute_available_slots(day(), &window(8, 20), 45, &entries)
        .unwrap();
    let second = calc
        .compute_available_slots(day(), &window(8, 20), 45, &entries)
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn concurrent_evaluations_agree() {
    let calc = calculator();
    let entries = vec![busy(9, 0, 10, 0)];
    let expected = calc
        .compute_available_slots(day(), &window(8, 20), 60, &entries)
        .unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    calc.compute_available_slots(day(), &window(8, 20), 60, &entries)
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
