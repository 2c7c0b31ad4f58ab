//! Conversions between the `HH:MM:SS` wire format, minutes since midnight
//! and `chrono::NaiveTime`.

use crate::domain::error::ItineraryError;
use chrono::{NaiveTime, Timelike};

pub const MINUTES_PER_HOUR: u32 = 60;
/// Exclusive upper bound of a day; also the clamp value for ranges that run past midnight.
pub const END_OF_DAY_MINUTES: u32 = 24 * MINUTES_PER_HOUR;

/// Parses `H:MM`, `HH:MM` or `HH:MM:SS` into minutes since midnight (0..=1439).
///
/// Seconds are accepted for robustness but do not contribute to the result.
/// They must still be a valid clock value (`00`..=`59`); `12:30:75` is
/// rejected like an out-of-range minute.
pub fn parse_time(value: &str) -> Result<u32, ItineraryError> {
    let invalid = || ItineraryError::InvalidTimeFormat(format!("'{value}' must be HH:MM or HH:MM:SS"));

    let mut split = value.split(':');
    let Some(hour_str) = split.next() else {
        return Err(invalid());
    };
    let Some(minute_str) = split.next() else {
        return Err(invalid());
    };
    let second_str = split.next();
    if split.next().is_some() {
        return Err(invalid());
    }

    if !is_digits(hour_str, 1, 2) || !is_digits(minute_str, 2, 2) {
        return Err(invalid());
    }
    if let Some(second_str) = second_str {
        if !is_digits(second_str, 2, 2) {
            return Err(invalid());
        }
        let second = second_str.parse::<u32>().map_err(|_| invalid())?;
        if second > 59 {
            return Err(ItineraryError::InvalidTimeFormat(format!(
                "'{value}' has second out of range"
            )));
        }
    }

    let hour = hour_str.parse::<u32>().map_err(|_| invalid())?;
    let minute = minute_str.parse::<u32>().map_err(|_| invalid())?;
    if hour > 23 {
        return Err(ItineraryError::InvalidTimeFormat(format!(
            "'{value}' has hour out of range"
        )));
    }
    if minute > 59 {
        return Err(ItineraryError::InvalidTimeFormat(format!(
            "'{value}' has minute out of range"
        )));
    }
    Ok(hour * MINUTES_PER_HOUR + minute)
}

fn is_digits(value: &str, min_len: usize, max_len: usize) -> bool {
    (min_len..=max_len).contains(&value.len()) && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Formats minutes since midnight as the persisted `HH:MM:SS` form (seconds always `00`).
///
/// Values past the end of the day wrap onto the clock face.
pub fn format_time(minutes: u32) -> String {
    let minutes = minutes % END_OF_DAY_MINUTES;
    format!(
        "{:02}:{:02}:00",
        minutes / MINUTES_PER_HOUR,
        minutes % MINUTES_PER_HOUR
    )
}

/// 12-hour display form, e.g. `9:00 AM`, `12:00 PM`, `1:05 PM`.
pub fn format_time_display(minutes: u32) -> String {
    let hour = (minutes / MINUTES_PER_HOUR) % 24;
    let minute = minutes % MINUTES_PER_HOUR;
    format!("{}:{minute:02} {}", twelve_hour(hour), meridiem(hour))
}

/// Parses a wire time string and renders it with [`format_time_display`].
pub fn format_time_string_display(value: &str) -> Result<String, ItineraryError> {
    parse_time(value).map(format_time_display)
}

/// Gridline label such as `8 AM`.
///
/// `24` is the end-of-day boundary and renders as `12 PM` so it never collides
/// with the `12 AM` of hour `0`. Hours past 24 only appear when the minimum
/// span pushes a late window over midnight; those wrap onto the next day's clock.
pub fn format_hour_label(hour: u32) -> String {
    let hour = if hour > 24 { hour % 24 } else { hour };
    format!("{} {}", twelve_hour(hour), meridiem(hour))
}

fn twelve_hour(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        value => value,
    }
}

fn meridiem(hour: u32) -> &'static str {
    if hour >= 12 { "PM" } else { "AM" }
}

pub fn minutes_to_naive_time(minutes: u32) -> Option<NaiveTime> {
    if minutes >= END_OF_DAY_MINUTES {
        return None;
    }
    NaiveTime::from_hms_opt(minutes / MINUTES_PER_HOUR, minutes % MINUTES_PER_HOUR, 0)
}

/// Minutes since midnight for a time-of-day value; seconds are truncated.
pub fn naive_time_to_minutes(time: NaiveTime) -> u32 {
    time.hour() * MINUTES_PER_HOUR + time.minute()
}

/// `HH:MM:00` for a time-of-day value, the form written back to the store.
pub fn naive_time_to_wire(time: NaiveTime) -> String {
    format_time(naive_time_to_minutes(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_time_accepts_wire_and_short_forms() {
        assert_eq!(parse_time("00:00:00").expect("midnight"), 0);
        assert_eq!(parse_time("10:00:00").expect("ten"), 600);
        assert_eq!(parse_time("07:30").expect("short form"), 450);
        assert_eq!(parse_time("7:30").expect("single digit hour"), 450);
        assert_eq!(parse_time("23:59:59").expect("last minute"), 1439);
    }

    #[test]
    fn parse_time_rejects_malformed_values() {
        for value in [
            "", "10", "10:0", "10:000", "100:00", "24:00", "12:60", "12:30:60", "12:30:75", "ab:cd",
            "12:30:00:00", " 9:00", "-1:00", "+9:00",
        ] {
            match parse_time(value) {
                Err(ItineraryError::InvalidTimeFormat(_)) => {}
                other => panic!("expected InvalidTimeFormat for {value:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn format_time_display_uses_twelve_hour_clock() {
        assert_eq!(format_time_string_display("00:00:00").expect("midnight"), "12:00 AM");
        assert_eq!(format_time_string_display("13:05:00").expect("afternoon"), "1:05 PM");
        assert_eq!(format_time_string_display("09:00:00").expect("morning"), "9:00 AM");
        assert_eq!(format_time_display(12 * 60), "12:00 PM");
        assert_eq!(format_time_display(23 * 60 + 59), "11:59 PM");
    }

    #[test]
    fn format_hour_label_covers_day_boundaries() {
        assert_eq!(format_hour_label(0), "12 AM");
        assert_eq!(format_hour_label(8), "8 AM");
        assert_eq!(format_hour_label(12), "12 PM");
        assert_eq!(format_hour_label(21), "9 PM");
        assert_eq!(format_hour_label(24), "12 PM");
        assert_ne!(format_hour_label(24), format_hour_label(0));
        assert_eq!(format_hour_label(25), "1 AM");
    }

    #[test]
    fn naive_time_conversions_truncate_seconds() {
        let time = NaiveTime::from_hms_opt(9, 41, 27).expect("valid time");
        assert_eq!(naive_time_to_minutes(time), 581);
        assert_eq!(naive_time_to_wire(time), "09:41:00");
        assert_eq!(
            minutes_to_naive_time(581),
            NaiveTime::from_hms_opt(9, 41, 0)
        );
        assert_eq!(minutes_to_naive_time(END_OF_DAY_MINUTES), None);
    }

    proptest! {
        #[test]
        fn parse_time_inverts_format_time(minutes in 0u32..END_OF_DAY_MINUTES) {
            prop_assert_eq!(parse_time(&format_time(minutes)).expect("formatted time parses"), minutes);
        }

        #[test]
        fn naive_time_roundtrip(minutes in 0u32..END_OF_DAY_MINUTES) {
            let time = minutes_to_naive_time(minutes).expect("in-range minutes");
            prop_assert_eq!(naive_time_to_minutes(time), minutes);
        }
    }
}
