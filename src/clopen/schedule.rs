use crate::error::{DeepdexError, Result};
use chrono::{DateTime, Duration, NaiveTime, Timelike, Utc};

/// A daily open/close window expressed in minutes after UTC midnight.
///
/// The window may wrap past midnight (`open 22:00, close 06:00`). Opening
/// and closing at the same minute is rejected because the channel would
/// never change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    open_minute: u16,
    close_minute: u16,
}

impl DailySchedule {
    pub fn new(open_minute: u16, close_minute: u16) -> Result<Self> {
        if open_minute >= 1440 || close_minute >= 1440 {
            return Err(DeepdexError::Validation(
                "Schedule times must be within a single day.".to_string(),
            ));
        }
        if open_minute == close_minute {
            return Err(DeepdexError::Validation(
                "Opening and closing times must differ.".to_string(),
            ));
        }
        Ok(Self {
            open_minute,
            close_minute,
        })
    }

    /// Builds a schedule from two `HH:MM` strings.
    pub fn parse(open: &str, close: &str) -> Result<Self> {
        Self::new(parse_time(open)?, parse_time(close)?)
    }

    pub fn open_minute(&self) -> u16 {
        self.open_minute
    }

    pub fn close_minute(&self) -> u16 {
        self.close_minute
    }

    /// Whether the schedule says the channel should be open at `now`.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let minute = (now.hour() * 60 + now.minute()) as u16;
        if self.open_minute < self.close_minute {
            minute >= self.open_minute && minute < self.close_minute
        } else {
            minute >= self.open_minute || minute < self.close_minute
        }
    }

    /// First opening time strictly after `after`.
    pub fn next_open_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        next_occurrence(after, self.open_minute)
    }

    /// First closing time strictly after `after`.
    pub fn next_close_after(&self, after: DateTime<Utc>) -> DateTime<Utc> {
        next_occurrence(after, self.close_minute)
    }
}

/// Parses an `HH:MM` 24-hour time into a minute of the day.
pub fn parse_time(input: &str) -> Result<u16> {
    let (hours, minutes) = input.split_once(':').ok_or_else(|| invalid_time(input))?;
    let hours: u16 = hours.parse().map_err(|_| invalid_time(input))?;
    let minutes: u16 = minutes.parse().map_err(|_| invalid_time(input))?;
    if hours > 23 || minutes > 59 {
        return Err(invalid_time(input));
    }
    Ok(hours * 60 + minutes)
}

/// Renders a minute of the day back to `HH:MM`.
pub fn format_minute(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

fn invalid_time(input: &str) -> DeepdexError {
    DeepdexError::Validation(format!(
        "Invalid time '{input}'. Expected HH:MM in 24-hour UTC."
    ))
}

fn next_occurrence(after: DateTime<Utc>, minute: u16) -> DateTime<Utc> {
    let midnight = after.date_naive().and_time(NaiveTime::MIN).and_utc();
    let mut candidate = midnight + Duration::minutes(i64::from(minute));
    while candidate <= after {
        candidate += Duration::days(1);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("00:00").unwrap(), 0);
        assert_eq!(parse_time("09:30").unwrap(), 570);
        assert_eq!(parse_time("23:59").unwrap(), 1439);

        assert!(parse_time("24:00").is_err());
        assert!(parse_time("12:60").is_err());
        assert!(parse_time("1230").is_err());
        assert!(parse_time("ab:cd").is_err());
    }

    #[test]
    fn test_rejects_equal_open_and_close() {
        assert!(DailySchedule::new(600, 600).is_err());
        assert!(DailySchedule::new(600, 601).is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_minutes() {
        assert!(DailySchedule::new(1440, 600).is_err());
        assert!(DailySchedule::new(600, 2000).is_err());
    }

    #[test]
    fn test_window_within_one_day() {
        let schedule = DailySchedule::parse("09:00", "17:00").unwrap();
        assert!(!schedule.is_open_at(at(8, 59)));
        assert!(schedule.is_open_at(at(9, 0)));
        assert!(schedule.is_open_at(at(16, 59)));
        assert!(!schedule.is_open_at(at(17, 0)));
    }

    #[test]
    fn test_window_wrapping_midnight() {
        let schedule = DailySchedule::parse("22:00", "06:00").unwrap();
        assert!(schedule.is_open_at(at(23, 30)));
        assert!(schedule.is_open_at(at(2, 0)));
        assert!(!schedule.is_open_at(at(6, 0)));
        assert!(!schedule.is_open_at(at(12, 0)));
    }

    #[test]
    fn test_next_open_is_strictly_in_the_future() {
        let schedule = DailySchedule::parse("09:00", "17:00").unwrap();
        assert_eq!(schedule.next_open_after(at(8, 0)), at(9, 0));
        // Exactly at the opening minute the next occurrence is tomorrow.
        let next = schedule.next_open_after(at(9, 0));
        assert_eq!(next, at(9, 0) + Duration::days(1));
    }

    #[test]
    fn test_next_close_crosses_midnight() {
        let schedule = DailySchedule::parse("22:00", "06:00").unwrap();
        let next = schedule.next_close_after(at(23, 0));
        assert_eq!(next, at(6, 0) + Duration::days(1));
    }

    #[test]
    fn test_format_minute() {
        assert_eq!(format_minute(0), "00:00");
        assert_eq!(format_minute(570), "09:30");
        assert_eq!(format_minute(1439), "23:59");
    }
}
