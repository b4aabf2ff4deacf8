//! Optimal 15-Puzzle Solver Library
//!
//! Solves any solvable 4x4 sliding-tile configuration in the minimum
//! number of blank-moves, using IDA* with a choice of admissible
//! heuristics: walking distance, Manhattan distance with linear conflict,
//! and additive disjoint pattern databases (6-6-3, 5-5-5, 7-8, or custom
//! partitions). Precomputed tables persist under `database/` and are
//! regenerated whenever a file is missing or unreadable.

pub mod board;
pub mod direction;
pub mod elements;
pub mod error;
pub mod heuristic;
pub mod oracle;
pub mod pattern;
pub mod persistence;
pub mod solver;
pub mod walking;

pub use board::{Board, Level};
pub use direction::Direction;
pub use error::Error;
pub use heuristic::HeuristicKind;
pub use solver::{SolveResult, Solver};
