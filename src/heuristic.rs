//! Heuristic selection and the Manhattan / linear-conflict estimate.
//!
//! Every stack combines independently admissible lower bounds by maximum:
//! Manhattan distance with linear conflict, the two walking-distance
//! projections, and (for the pattern stacks) the additive database value of
//! the board and of its symmetry twin. Linear conflict uses the diagonal
//! twin's tile array for column conflicts, so only rows are ever scanned.

use crate::board::{ROW_SIZE, SIZE};
use crate::pattern::Pattern;

/// Heuristic stack driving the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeuristicKind {
    /// Walking distance only.
    Wd,
    /// Walking distance with Manhattan distance and linear conflict.
    WdMd,
    /// 5-5-5 additive pattern database.
    Pdb555,
    /// 6-6-3 additive pattern database.
    Pdb663,
    /// 7-8 additive pattern database.
    Pdb78,
}

impl HeuristicKind {
    /// The pattern partition backing this stack, when it uses one.
    pub fn pattern(self) -> Option<Pattern> {
        match self {
            HeuristicKind::Wd | HeuristicKind::WdMd => None,
            HeuristicKind::Pdb555 => Some(Pattern::p555()),
            HeuristicKind::Pdb663 => Some(Pattern::p663()),
            HeuristicKind::Pdb78 => Some(Pattern::p78()),
        }
    }
}

/// Manhattan distance plus linear conflict over both tile arrays.
///
/// A tile sitting in its goal row with a smaller same-row tile somewhere to
/// its right adds 2: one of the pair must leave the row and come back. The
/// symmetry twin contributes the column conflicts the same way.
pub fn manhattan_with_conflicts(tiles: &[u8; SIZE], tiles_sym: &[u8; SIZE]) -> u32 {
    let mut value = 0u32;
    for row in 0..ROW_SIZE {
        let base = row * ROW_SIZE;
        for col in 0..ROW_SIZE {
            let tile = tiles[base + col] as usize;
            if tile > 0 {
                let goal = tile - 1;
                value += (goal % ROW_SIZE).abs_diff(col) as u32;
                value += (goal / ROW_SIZE).abs_diff(row) as u32;
                if tile > base && tile <= base + ROW_SIZE {
                    value += pair_conflict(tiles, base, col, tile);
                }
            }
            let twin = tiles_sym[base + col] as usize;
            if twin > base && twin <= base + ROW_SIZE {
                value += pair_conflict(tiles_sym, base, col, twin);
            }
        }
    }
    value
}

// 2 when any smaller tile of the same goal row sits right of `col`
#[inline]
fn pair_conflict(tiles: &[u8; SIZE], base: usize, col: usize, tile: usize) -> u32 {
    for col2 in col + 1..ROW_SIZE {
        let other = tiles[base + col2] as usize;
        if other > base && other < tile {
            return 2;
        }
    }
    0
}

/// Linear-conflict contribution of a single row, counted the same way as
/// `manhattan_with_conflicts`; the solver re-scans only affected rows when
/// a tile moves.
pub(crate) fn row_conflicts(tiles: &[u8; SIZE], row: usize) -> u32 {
    let base = row * ROW_SIZE;
    let mut conflicts = 0;
    for col in 0..ROW_SIZE {
        let tile = tiles[base + col] as usize;
        if tile > base && tile <= base + ROW_SIZE {
            conflicts += pair_conflict(tiles, base, col, tile);
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, GOAL};

    #[test]
    fn test_goal_scores_zero() {
        let board = Board::from_tiles(&GOAL).unwrap();
        assert_eq!(manhattan_with_conflicts(board.tiles(), board.tiles_sym()), 0);
    }

    #[test]
    fn test_row_conflict_adds_two() {
        // 2 and 1 are swapped within their goal row
        let board =
            Board::from_tiles(&[2, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0]).unwrap();
        assert_eq!(manhattan_with_conflicts(board.tiles(), board.tiles_sym()), 4);
        assert_eq!(row_conflicts(board.tiles(), 0), 2);
    }

    #[test]
    fn test_column_conflict_comes_from_the_twin() {
        // 1 and 5 are swapped within their goal column
        let board =
            Board::from_tiles(&[5, 2, 3, 4, 1, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0]).unwrap();
        assert_eq!(row_conflicts(board.tiles(), 0), 0);
        assert_eq!(manhattan_with_conflicts(board.tiles(), board.tiles_sym()), 4);
    }

    #[test]
    fn test_reversed_triple_counts_each_leader() {
        // 3, 2, 1 reversed in the top row: MD 4 + two leaders * 2
        let board =
            Board::from_tiles(&[3, 2, 1, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 0]).unwrap();
        assert_eq!(manhattan_with_conflicts(board.tiles(), board.tiles_sym()), 8);
    }
}
