use crate::id::KeyflakeId;

/// The outcome of a single non-blocking generation attempt.
///
/// Returned by [`LockKeyGenerator::poll_id`]:
///
/// - [`Poll::Ready`] carries a freshly issued ID.
/// - [`Poll::Pending`] means no ID can be issued until the clock advances by
///   at least `yield_for` milliseconds, either because the sequence for the
///   current millisecond is exhausted or because the clock is behind the last
///   issued timestamp.
///
/// [`LockKeyGenerator::poll_id`]: crate::LockKeyGenerator::poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: KeyflakeId,
    },
    /// No ID could be generated at this instant.
    Pending {
        /// Milliseconds to wait before trying again.
        yield_for: u64,
    },
}
