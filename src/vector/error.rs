use thiserror::Error;

/// Errors surfaced by the state-changing operations.
///
/// User errors come back as `Err`; invariant violations (such as indexing
/// into storage that was never allocated) panic immediately, as they
/// indicate a broken caller contract rather than a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// `pop_back` observed an empty vector. The observation is per-attempt:
    /// a pop racing concurrent pops may see a transient empty state and
    /// fail even while a push is still in flight.
    #[error("pop_back was called on an empty vector")]
    Empty,

    /// The next element would land past the last bucket; every one of the
    /// vector's storage blocks is already in use.
    #[error("vector capacity exhausted: all buckets are in use")]
    CapacityExhausted,
}
