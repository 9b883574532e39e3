use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type EpochMillis = u64;

pub const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as EpochMillis
}

/// Convert a whole number of days to a [`Duration`].
pub fn days(count: u64) -> Duration {
    Duration::from_millis(count.saturating_mul(MILLIS_PER_DAY))
}
