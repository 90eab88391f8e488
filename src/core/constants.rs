//! Timing constants shared by streams and readers

use std::time::Duration;

/// Wait before retrying a sensor that reported it is still warming up
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Granularity of the pre-heat wait
pub const PRE_HEAT_TICK: Duration = Duration::from_secs(1);

/// Upper bound for a single transport read (seconds)
pub const DEFAULT_TIMEOUT_SECS: f64 = 5.0;

/// Longest uninterrupted slice of a cancellable sleep
pub const SLEEP_SLICE: Duration = Duration::from_millis(100);
