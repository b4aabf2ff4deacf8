//! Crate error type.
//!
//! Unsolvable boards and search timeouts are signaled values, not errors,
//! and table I/O problems are recovered locally by regeneration; this enum
//! covers invalid caller input only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Tile array is not a permutation of 0..=15 over 16 cells.
    #[error("invalid tile array: {0}")]
    InvalidTiles(String),

    /// Pattern groups must be disjoint, cover tiles 1..=15, and use group
    /// sizes in {3, 5, 6, 7, 8}.
    #[error("invalid pattern partition: {0}")]
    InvalidPattern(String),
}
