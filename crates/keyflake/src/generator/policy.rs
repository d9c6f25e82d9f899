/// How a generator reacts when the time source reports a timestamp earlier
/// than the last one it issued (e.g., after an NTP step on a wall clock).
///
/// [`MonotonicClock`] never regresses, so the policy only matters for
/// [`WallClock`] and custom time sources.
///
/// [`MonotonicClock`]: crate::MonotonicClock
/// [`WallClock`]: crate::WallClock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClockRegression {
    /// Hold issuance until the clock is back at the last issued timestamp.
    ///
    /// IDs stay strictly increasing; callers of
    /// [`LockKeyGenerator::next_id`] stall for the length of the regression
    /// and [`LockKeyGenerator::poll_id`] reports it as pending.
    ///
    /// [`LockKeyGenerator::next_id`]: crate::LockKeyGenerator::next_id
    /// [`LockKeyGenerator::poll_id`]: crate::LockKeyGenerator::poll_id
    #[default]
    Wait,

    /// Treat the earlier reading as a new millisecond and reset the sequence.
    ///
    /// Issuance never stalls, but an ID numerically smaller than one already
    /// handed out may be produced, and a duplicate is possible if the clock
    /// revisits a millisecond whose sequence values were already used.
    Tolerate,
}
