//! Time source abstraction.
//!
//! All "today" decisions in the tracker go through a [`Clock`] so tests can
//! inject synthetic dates. The calendar date for a user is derived from UTC
//! plus the user's configured day-boundary offset.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Smallest accepted day-boundary offset (UTC-12:00), in minutes.
pub const MIN_UTC_OFFSET_MINUTES: i32 = -12 * 60;

/// Largest accepted day-boundary offset (UTC+14:00), in minutes.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Supplies the current instant.
///
/// Implementations must be cheap to call; the tracker queries the clock once
/// per operation.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a fixed instant, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Creates a clock that always reports the given instant.
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns whether an offset is a plausible day-boundary offset.
pub const fn offset_in_range(utc_offset_minutes: i32) -> bool {
    MIN_UTC_OFFSET_MINUTES <= utc_offset_minutes && utc_offset_minutes <= MAX_UTC_OFFSET_MINUTES
}

/// Computes the calendar date at the given instant for a user whose day
/// boundary is `utc_offset_minutes` east of UTC.
pub fn local_today(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    (now + Duration::minutes(i64::from(utc_offset_minutes))).date_naive()
}
