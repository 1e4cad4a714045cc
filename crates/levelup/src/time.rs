//! Time utilities for LevelUp.
//!
//! All timestamps are Unix epoch microseconds (u64). Calendar-day logic
//! (daily focus cap, analytics, streaks) uses the server-local day.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub const MICROS_PER_SECOND: u64 = 1_000_000;
pub const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;

/// Source of "now" for every engine operation.
pub trait Clock: Send + Sync {
    fn now_micros(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        now_micros()
    }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_micros: u64) -> Self {
        Self {
            now: AtomicU64::new(start_micros),
        }
    }

    /// Start at a server-local wall time; `None` if that time does not exist
    /// locally (DST gap).
    pub fn at_local(datetime: NaiveDateTime) -> Option<Self> {
        local_to_micros(datetime).map(Self::new)
    }

    pub fn set(&self, micros: u64) {
        self.now.store(micros, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now.fetch_add(secs * MICROS_PER_SECOND, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: u64) {
        self.now.fetch_add(minutes * MICROS_PER_MINUTE, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Return the current time as microseconds since Unix epoch.
pub fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

fn to_utc(micros: u64) -> DateTime<Utc> {
    let secs = (micros / MICROS_PER_SECOND) as i64;
    let nsecs = ((micros % MICROS_PER_SECOND) * 1000) as u32;
    DateTime::from_timestamp(secs, nsecs).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Convert microseconds to an RFC 3339 string.
pub fn micros_to_rfc3339(micros: u64) -> String {
    to_utc(micros).to_rfc3339()
}

/// Format microseconds as a short local timestamp for display.
pub fn micros_to_local_display(micros: u64) -> String {
    to_utc(micros)
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// The server-local calendar date containing `micros`.
pub fn local_date(micros: u64) -> NaiveDate {
    to_utc(micros).with_timezone(&Local).date_naive()
}

/// Microseconds of a local wall time.
pub fn local_to_micros(datetime: NaiveDateTime) -> Option<u64> {
    Local
        .from_local_datetime(&datetime)
        .earliest()
        .map(|dt| dt.timestamp_micros().max(0) as u64)
}

/// `[start, end)` microsecond bounds of a server-local calendar day.
pub fn local_day_bounds(date: NaiveDate) -> (u64, u64) {
    let start = day_start_micros(date);
    let end = date
        .succ_opt()
        .map(day_start_micros)
        .unwrap_or(start + 24 * 3600 * MICROS_PER_SECOND);
    (start, end)
}

fn day_start_micros(date: NaiveDate) -> u64 {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    // Midnight can fall in a DST gap; the first instant of the day is then
    // an hour later.
    local_to_micros(midnight)
        .or_else(|| date.and_hms_opt(1, 0, 0).and_then(local_to_micros))
        .unwrap_or_else(|| midnight.and_utc().timestamp_micros().max(0) as u64)
}
