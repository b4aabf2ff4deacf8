//! Reference-board oracle.
//!
//! An oracle remembers boards that were already solved optimally and hands
//! the solver a tighter initial cost bound, optionally with the first moves
//! of the stored solution as a guaranteed prefix. Lookup failures of any
//! kind degrade silently to a standard search.

use rustc_hash::FxHashMap;
use std::sync::RwLock;

use crate::board::Board;
use crate::direction::Direction;

/// Longest stored-solution prefix handed back to the solver.
const PREFIX_LIMIT: usize = 8;

/// A stored estimate for a known board.
#[derive(Clone, Debug)]
pub struct ReferenceEntry {
    /// Optimal solution length recorded for the board.
    pub estimate: u8,
    /// Leading moves of the stored solution, possibly empty.
    pub partial_moves: Vec<Direction>,
}

/// Collection of previously solved boards.
pub trait ReferenceOracle: Send + Sync {
    /// Returns the stored entry for a board, or `None` when unknown or
    /// unavailable.
    fn lookup(&self, board: &Board) -> Option<ReferenceEntry>;

    /// Records an optimal solution for a board.
    fn submit(&self, board: &Board, moves: &[Direction]);
}

/// Process-local oracle backed by a hash map on the board's packed hashes.
#[derive(Default)]
pub struct InMemoryReference {
    entries: RwLock<FxHashMap<(u32, u32), Vec<Direction>>>,
}

impl InMemoryReference {
    pub fn new() -> InMemoryReference {
        InMemoryReference::default()
    }

    /// Number of stored boards.
    pub fn len(&self) -> usize {
        self.entries.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReferenceOracle for InMemoryReference {
    fn lookup(&self, board: &Board) -> Option<ReferenceEntry> {
        // a poisoned lock degrades to "unavailable"
        let entries = self.entries.read().ok()?;
        let moves = entries.get(&(board.hash1(), board.hash2()))?;
        Some(ReferenceEntry {
            estimate: moves.len() as u8,
            partial_moves: moves[..moves.len().min(PREFIX_LIMIT)].to_vec(),
        })
    }

    fn submit(&self, board: &Board, moves: &[Direction]) {
        if let Ok(mut entries) = self.entries.write() {
            let key = (board.hash1(), board.hash2());
            // keep the longest confirmed optimum per board
            let known = entries.get(&key).map_or(0, Vec::len);
            if moves.len() > known || !entries.contains_key(&key) {
                entries.insert(key, moves.to_vec());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GOAL;

    #[test]
    fn test_lookup_round_trip() {
        let oracle = InMemoryReference::new();
        let board =
            Board::from_tiles(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0, 13, 14, 15, 12]).unwrap();
        assert!(oracle.lookup(&board).is_none());

        oracle.submit(&board, &[Direction::Down]);
        let entry = oracle.lookup(&board).unwrap();
        assert_eq!(entry.estimate, 1);
        assert_eq!(entry.partial_moves, vec![Direction::Down]);
        assert_eq!(oracle.len(), 1);
    }

    #[test]
    fn test_prefix_is_capped() {
        let oracle = InMemoryReference::new();
        let board = Board::from_tiles(&GOAL).unwrap();
        let moves = vec![Direction::Left; 12];
        oracle.submit(&board, &moves);
        let entry = oracle.lookup(&board).unwrap();
        assert_eq!(entry.estimate, 12);
        assert_eq!(entry.partial_moves.len(), PREFIX_LIMIT);
    }
}
