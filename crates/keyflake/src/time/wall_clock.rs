use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::time::{REFERENCE_EPOCH, TimeSource};

/// A time source that reads the system wall clock on every call.
///
/// Each reading is `SystemTime::now()` minus the configured epoch. The wall
/// clock may be stepped backward by NTP or an operator; how a generator reacts
/// to that is controlled by [`ClockRegression`].
///
/// A system time earlier than the epoch reads as `0`.
///
/// [`ClockRegression`]: crate::ClockRegression
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WallClock {
    epoch_millis: u64,
}

impl Default for WallClock {
    /// Constructs a wall clock aligned to [`REFERENCE_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(REFERENCE_EPOCH)
    }
}

impl WallClock {
    /// Constructs a wall clock using `epoch` (a [`Duration`] since
    /// 1970-01-01 UTC) as the origin.
    pub fn with_epoch(epoch: Duration) -> Self {
        Self {
            epoch_millis: epoch.as_millis() as u64,
        }
    }

    /// The configured origin in Unix milliseconds.
    pub fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }
}

impl TimeSource for WallClock {
    fn current_millis(&self) -> u64 {
        let unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64);
        unix_millis.saturating_sub(self.epoch_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_relative_to_reference_epoch() {
        let clock = WallClock::default();
        let unix_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        let millis = clock.current_millis();
        let expected = unix_millis - 946_684_800_000;
        assert!(millis >= expected && millis - expected < 1_000);
    }

    #[test]
    fn epoch_in_the_future_reads_zero() {
        let clock = WallClock::with_epoch(Duration::from_millis(u64::MAX / 2));
        assert_eq!(clock.current_millis(), 0);
    }
}
