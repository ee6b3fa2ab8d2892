// A simple module to define the time types used in the project
//
// Wall clock is only used to estimate the sync progress of the tracked head,
// chain ordering always relies on block numbers and ids.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Millis timestamps used to determine it using its type
pub type TimestampMillis = u64;

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

// A clock set before the UNIX epoch is reported as the epoch itself
#[inline]
pub fn get_current_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

// Return timestamp in milliseconds
// We cast it to u64 as we have plenty of time before it overflows (year 584,942,417 AD)
pub fn get_current_time_in_millis() -> TimestampMillis {
    get_current_time().as_millis() as TimestampMillis
}

// Block timestamps are in seconds, progress is computed in milliseconds
#[inline]
pub fn seconds_to_millis(seconds: TimestampSeconds) -> TimestampMillis {
    seconds.saturating_mul(1000)
}
