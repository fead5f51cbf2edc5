#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Construction parameters for a [`ProbingTable`].
pub mod config;

/// Error types returned by table construction and growth.
pub mod error;

/// Key normalization applied before hashing, comparison, and storage.
pub mod key;

/// The quadratic-probing hash table.
///
/// This module provides [`ProbingTable`], its slot model, and the iterators
/// used to enumerate it.
pub mod probing_table;

pub use config::TableConfig;
pub use error::ConfigError;
pub use error::TableError;
pub use key::normalize_key;
#[cfg(any(test, feature = "stats"))]
pub use probing_table::DebugStats;
pub use probing_table::Insertion;
pub use probing_table::ProbingTable;
pub use probing_table::Slot;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`ProbingTable::new`].
        ///
        /// A fixed-seed foldhash, so a table hashes the same key identically
        /// for its whole lifetime.
        pub type DefaultHashBuilder = foldhash::fast::FixedState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`ProbingTable::new`].
        pub type DefaultHashBuilder =
            core::hash::BuildHasherDefault<std::hash::DefaultHasher>;
    }
}
