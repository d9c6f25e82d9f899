use core::time::Duration;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::{
    error::{Error, Result},
    time::{REFERENCE_EPOCH, TimeSource},
};

/// A monotonic time source that returns elapsed time since construction,
/// offset from a user-defined epoch.
///
/// The wall clock is consulted once, when the clock is built, to compute how
/// far the epoch lies in the past. From then on time advances with
/// [`Instant`], so readings never go backward even if the system clock is
/// adjusted (e.g., NTP steps).
///
/// Clones share the same anchor.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    start: Instant,
    epoch_offset: u64, // in milliseconds
}

impl MonotonicClock {
    /// Constructs a monotonic clock aligned to [`REFERENCE_EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockBeforeEpoch`] if the system time is earlier than
    /// the reference epoch.
    pub fn try_default() -> Result<Self> {
        Self::with_epoch(REFERENCE_EPOCH)
    }

    /// Constructs a monotonic clock using `epoch` (a [`Duration`] since
    /// 1970-01-01 UTC) as the origin (t = 0).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockBeforeEpoch`] if the system time is earlier than
    /// `epoch`.
    ///
    /// # Example
    ///
    /// ```
    /// use keyflake::{MonotonicClock, REFERENCE_EPOCH, TimeSource};
    ///
    /// let clock = MonotonicClock::with_epoch(REFERENCE_EPOCH).unwrap();
    /// let first = clock.current_millis();
    /// std::thread::sleep(std::time::Duration::from_millis(2));
    /// assert!(clock.current_millis() >= first + 2);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Result<Self> {
        let start = Instant::now();
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| Error::ClockBeforeEpoch)?;
        let offset = system_now
            .checked_sub(epoch)
            .ok_or(Error::ClockBeforeEpoch)?;

        Ok(Self {
            start,
            epoch_offset: offset.as_millis() as u64,
        })
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the number of milliseconds since the configured epoch, based on
    /// the elapsed monotonic time since construction.
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_epoch_in_the_future() {
        let future = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            + Duration::from_secs(3_600);
        assert_eq!(
            MonotonicClock::with_epoch(future).unwrap_err(),
            Error::ClockBeforeEpoch
        );
    }

    #[test]
    fn never_goes_backward() {
        let clock = MonotonicClock::try_default().unwrap();
        let mut last = clock.current_millis();
        for _ in 0..10_000 {
            let now = clock.current_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn clones_share_anchor() {
        let clock = MonotonicClock::try_default().unwrap();
        let copy = clock;
        let a = clock.current_millis();
        let b = copy.current_millis();
        assert!(b >= a && b - a < 100);
    }
}
