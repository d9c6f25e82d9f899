/// A result type defaulting to this crate's [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `keyflake` can produce.
///
/// Errors only surface while constructing a generator or a clock. Once a
/// [`LockKeyGenerator`] exists, producing IDs is infallible: an exhausted
/// sequence or a stalled clock is waited out rather than reported.
///
/// [`LockKeyGenerator`]: crate::LockKeyGenerator
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The machine ID does not fit the 4-bit machine field.
    #[error("machine id {machine_id} is out of range (max {max})")]
    InvalidMachineId {
        /// The rejected machine ID.
        machine_id: u64,
        /// The largest machine ID the layout can hold.
        max: u64,
    },

    /// The system clock reads earlier than the epoch a clock was anchored to.
    #[error("system clock is earlier than the configured epoch")]
    ClockBeforeEpoch,
}
