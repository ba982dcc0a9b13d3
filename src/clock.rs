use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};

use crate::error::{Result, TickError};

/// Source of "now" for filters; the offset defines the local calendar date.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the machine's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Parse a due date typed by the user: `YYYY-MM-DD` means local midnight in
/// `now`'s offset, anything else must be RFC 3339.
pub fn parse_due_date(input: &str, now: &DateTime<FixedOffset>) -> Result<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| now.timezone().from_local_datetime(&midnight).single())
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| TickError::InvalidDate(input.to_string()));
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| TickError::InvalidDate(input.to_string()))
}
