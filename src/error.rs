use thiserror::Error;

/// Failures that can abort a mutating table operation.
///
/// Both variants are raised while growing the table. When either is
/// returned the table is left exactly as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// The backing slot sequence for the grown table could not be allocated.
    #[error("failed to allocate a backing sequence of {capacity} slots")]
    AllocationFailed {
        /// The slot count that was requested.
        capacity: usize,
    },
    /// Doubling the current capacity would overflow `usize`.
    #[error("table capacity overflow")]
    CapacityOverflow,
}

/// Rejected [`TableConfig`](crate::TableConfig) values.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// A table needs at least one slot to hash into.
    #[error("initial capacity must be at least 1")]
    ZeroCapacity,
    /// The maximum load factor must lie strictly between 0 and 1.
    #[error("max load factor must be in (0, 1), got {0}")]
    InvalidLoadFactor(f64),
}
