use core::{cmp::Ordering, fmt};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[cfg(not(feature = "parking-lot"))]
use crate::generator::mutex::PoisonError;
use crate::{
    error::{Error, Result},
    generator::{
        ClockRegression, Poll,
        mutex::{Mutex, MutexGuard},
    },
    id::KeyflakeId,
    time::{TimeSource, WallClock},
};

/// A [`LockKeyGenerator`] reading the system wall clock from
/// [`REFERENCE_EPOCH`].
///
/// [`REFERENCE_EPOCH`]: crate::REFERENCE_EPOCH
pub type KeyGenerator = LockKeyGenerator<WallClock>;

/// Mutable generator state, only ever touched under the instance lock.
#[derive(Debug, Default)]
struct State {
    /// Timestamp of the most recent issuance; `None` until the first ID.
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// A lock-based ID generator suitable for multi-threaded environments.
///
/// Every generator owns one mutex guarding its last timestamp and sequence
/// counter. The whole read-clock, compare, update and pack sequence runs
/// while holding it, so IDs leave the generator in lock-acquisition order and
/// are strictly increasing per instance. Separate instances never share a
/// lock.
///
/// Within one millisecond the sequence advances as `(sequence + 1) % 4095`.
/// When it wraps to zero the millisecond is exhausted (sequence values
/// `0..=4094` have been issued; `4095` is never used) and [`Self::next_id`]
/// spins on the clock, still holding the lock, until the next millisecond.
///
/// ## Features
/// - ✅ Thread-safe (`Send + Sync` when the time source is)
/// - ✅ Never returns an error or a duplicate from [`Self::next_id`]
/// - ✅ Non-blocking [`Self::poll_id`] for callers that prefer to back off
///
/// # Example
///
/// ```
/// use std::{sync::Arc, thread};
/// use keyflake::{KeyGenerator, WallClock};
///
/// let generator = Arc::new(KeyGenerator::new(5, WallClock::default()).unwrap());
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let generator = Arc::clone(&generator);
///         thread::spawn(move || generator.next_id())
///     })
///     .collect();
///
/// for handle in handles {
///     assert_eq!(handle.join().unwrap().machine_id(), 5);
/// }
/// ```
pub struct LockKeyGenerator<T>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<Mutex<State>>,
    #[cfg(not(feature = "cache-padded"))]
    state: Mutex<State>,
    machine_id: u64,
    policy: ClockRegression,
    time: T,
}

impl<T> LockKeyGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new generator for `machine_id`, waiting out clock
    /// regressions ([`ClockRegression::Wait`]).
    ///
    /// # Parameters
    ///
    /// - `machine_id`: A unique identifier for the node or process generating
    ///   IDs, in `0..=15`. It is encoded into bits 12-15 of every ID.
    /// - `time`: A [`TimeSource`] implementation (e.g., [`WallClock`]) that
    ///   determines how timestamps are generated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMachineId`] if `machine_id` exceeds
    /// [`KeyflakeId::max_machine_id`]. No generator is created.
    ///
    /// # Example
    ///
    /// ```
    /// use keyflake::{Error, LockKeyGenerator, WallClock};
    ///
    /// assert!(LockKeyGenerator::new(15, WallClock::default()).is_ok());
    /// assert_eq!(
    ///     LockKeyGenerator::new(16, WallClock::default()).unwrap_err(),
    ///     Error::InvalidMachineId { machine_id: 16, max: 15 },
    /// );
    /// ```
    pub fn new(machine_id: u64, time: T) -> Result<Self> {
        Self::with_policy(machine_id, time, ClockRegression::default())
    }

    /// Creates a new generator with an explicit [`ClockRegression`] policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMachineId`] if `machine_id` exceeds
    /// [`KeyflakeId::max_machine_id`].
    pub fn with_policy(machine_id: u64, time: T, policy: ClockRegression) -> Result<Self> {
        let max = KeyflakeId::max_machine_id();
        if machine_id > max {
            return Err(Error::InvalidMachineId { machine_id, max });
        }

        let state = Mutex::new(State::default());
        Ok(Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
            machine_id,
            policy,
            time,
        })
    }

    /// The machine ID stamped into every generated ID.
    pub fn machine_id(&self) -> u64 {
        self.machine_id
    }

    /// The configured clock regression policy.
    pub fn policy(&self) -> ClockRegression {
        self.policy
    }

    /// Generates the next ID, blocking until one is available.
    ///
    /// Concurrent callers queue on the instance lock. If the current
    /// millisecond's sequence is exhausted (or, under
    /// [`ClockRegression::Wait`], the clock is behind), the lock holder spins
    /// on the time source until it advances; this typically costs well under
    /// a millisecond.
    ///
    /// # Example
    ///
    /// ```
    /// use keyflake::{KeyGenerator, WallClock};
    ///
    /// let generator = KeyGenerator::new(1, WallClock::default()).unwrap();
    /// let a = generator.next_id();
    /// let b = generator.next_id();
    /// assert!(a < b);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> KeyflakeId {
        let mut state = self.lock();
        // Each kind of stall is logged once per call.
        #[cfg(feature = "tracing")]
        let (mut waiting, mut behind) = (false, false);
        loop {
            let now = self.time.current_millis();
            match self.advance(&mut state, now) {
                Poll::Ready { id } => break id,
                Poll::Pending { yield_for: _yield_for } => {
                    #[cfg(feature = "tracing")]
                    match state.last_timestamp {
                        Some(last) if now < last => {
                            if !behind {
                                behind = true;
                                tracing::warn!(
                                    machine_id = self.machine_id,
                                    last,
                                    now,
                                    "clock moved backward; waiting for it to catch up"
                                );
                            }
                        }
                        _ => {
                            if !waiting {
                                waiting = true;
                                tracing::debug!(
                                    machine_id = self.machine_id,
                                    yield_for = _yield_for,
                                    "waiting for the clock to advance"
                                );
                            }
                        }
                    }
                    core::hint::spin_loop();
                }
            }
        }
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// Returns [`Poll::Ready`] with a new ID, or [`Poll::Pending`] with the
    /// number of milliseconds to back off when the sequence is exhausted or
    /// the clock is behind. A pending attempt leaves the generator state
    /// untouched.
    ///
    /// # Example
    ///
    /// ```
    /// use keyflake::{KeyGenerator, Poll, WallClock};
    ///
    /// let generator = KeyGenerator::new(0, WallClock::default()).unwrap();
    ///
    /// let id = loop {
    ///     match generator.poll_id() {
    ///         Poll::Ready { id } => break id,
    ///         Poll::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert_eq!(id.machine_id(), 0);
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn poll_id(&self) -> Poll {
        let mut state = self.lock();
        let now = self.time.current_millis();
        self.advance(&mut state, now)
    }

    /// Applies one clock reading to the state. Only mutates on
    /// [`Poll::Ready`].
    fn advance(&self, state: &mut State, now: u64) -> Poll {
        match state.last_timestamp.map(|last| (last, now.cmp(&last))) {
            Some((_, Ordering::Equal)) => {
                let sequence = (state.sequence + 1) % KeyflakeId::max_sequence();
                if sequence == 0 {
                    return Poll::Pending { yield_for: 1 };
                }
                state.sequence = sequence;
            }
            Some((last, Ordering::Less)) => match self.policy {
                ClockRegression::Wait => return Self::cold_clock_behind(now, last),
                ClockRegression::Tolerate => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        machine_id = self.machine_id,
                        last,
                        now,
                        "clock moved backward; resetting sequence"
                    );
                    state.sequence = 0;
                }
            },
            Some((_, Ordering::Greater)) | None => state.sequence = 0,
        }

        state.last_timestamp = Some(now);
        Poll::Ready {
            id: KeyflakeId::from_components(now, self.machine_id, state.sequence),
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last: u64) -> Poll {
        let yield_for = last - now;
        #[cfg(feature = "tracing")]
        tracing::trace!(last, now, yield_for, "clock is behind the last issued timestamp");
        Poll::Pending { yield_for }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        #[cfg(feature = "parking-lot")]
        {
            self.state.lock()
        }
        // State is never left half-updated, so a poisoned lock is still usable.
        #[cfg(not(feature = "parking-lot"))]
        {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

impl<T> fmt::Debug for LockKeyGenerator<T>
where
    T: TimeSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockKeyGenerator")
            .field("machine_id", &self.machine_id)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
