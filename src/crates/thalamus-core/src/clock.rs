//! Process-wide clocks.
//!
//! Signal timestamps are steady-clock durations anchored at the first
//! clock access of the process; record timestamps and the wall clock node
//! use the system clock as epoch nanoseconds.

use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

static START: OnceLock<Instant> = OnceLock::new();

/// The steady-clock anchor. First call pins it; subsequent calls return
/// the same instant.
pub fn start_instant() -> Instant {
    *START.get_or_init(Instant::now)
}

/// Monotonic time since the process anchor.
pub fn steady_now() -> Duration {
    start_instant().elapsed()
}

/// Wall-clock time as a duration since the UNIX epoch.
pub fn system_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

/// Nanosecond scalar used on the wire and in the record log.
pub fn to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

pub fn from_nanos(nanos: u64) -> Duration {
    Duration::from_nanos(nanos)
}
