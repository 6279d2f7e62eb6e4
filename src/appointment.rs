//! Booking rules: the half-hour slot grid, past start-time checks and the
//! cancellation window.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// First bookable slot of the day.
pub const FIRST_SLOT: (u32, u32) = (9, 0);
/// Last bookable slot of the day (start time).
pub const LAST_SLOT: (u32, u32) = (16, 30);
pub const SLOT_MINUTES: u32 = 30;

/// All slot start times for a day, "HH:MM", ascending.
pub fn day_slots() -> Vec<String> {
    let start = FIRST_SLOT.0 * 60 + FIRST_SLOT.1;
    let end = LAST_SLOT.0 * 60 + LAST_SLOT.1;
    (start..=end)
        .step_by(SLOT_MINUTES as usize)
        .map(|m| format!("{:02}:{:02}", m / 60, m % 60))
        .collect()
}

/// Day slots minus the times already booked.
pub fn available_slots(booked: &[String]) -> Vec<String> {
    day_slots()
        .into_iter()
        .filter(|slot| !booked.iter().any(|b| b == slot))
        .collect()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parse a strict `HH:MM` time.
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

/// A booking must start after `now`. Unparseable times fall back to the
/// start of the day.
pub fn starts_in_past(date: NaiveDate, time: &str, now: NaiveDateTime) -> bool {
    let start = parse_time(time).unwrap_or(NaiveTime::MIN);
    date.and_time(start) <= now
}

/// Cancellation is refused once the appointment's start time has passed.
/// Unparseable stored times fall back to the start of the day.
pub fn can_cancel(date: NaiveDate, time: &str, now: NaiveDateTime) -> bool {
    let start = parse_time(time).unwrap_or(NaiveTime::MIN);
    date.and_time(start) > now
}
