//! Walking-distance tables.
//!
//! Walking distance projects the board onto row occupancy: a 4x4 count
//! matrix whose entry (r, g) is the number of tiles currently in physical
//! row r that belong to goal row g. The blank's row is the unique row with
//! three tiles. One vertical blank-move transfers a single count between
//! adjacent rows, and the minimum number of such transfers to reach the
//! goal arrangement is an admissible lower bound on vertical moves.
//!
//! A BFS from the goal arrangement enumerates every state, records its
//! depth as the walking-distance value, and fills a transition table keyed
//! by (state, goal row of the moving tile, direction). The same tables
//! serve the column projection through the symmetry-twin tile array.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::board::{ROW_SIZE, SIZE};

/// Number of distinct walking-distance states on the 4x4 board.
pub const STATE_COUNT: usize = 24964;

const NO_LINK: u32 = u32::MAX;

type Counts = [[u8; ROW_SIZE]; ROW_SIZE];

/// Precomputed walking-distance values and transitions.
pub struct WalkingDistance {
    index: FxHashMap<u64, u32>,
    values: Vec<u8>,
    // state * 8 + goal_row * 2 + direction bit (0 forward, 1 backward)
    links: Vec<u32>,
}

impl WalkingDistance {
    /// Builds the full table by BFS from the goal arrangement.
    pub fn build() -> WalkingDistance {
        let goal = goal_counts();
        let goal_key = encode(&goal);

        let mut index = FxHashMap::default();
        let mut values = Vec::new();
        let mut links = Vec::new();
        let mut queue = VecDeque::new();

        index.insert(goal_key, 0u32);
        values.push(0);
        links.extend_from_slice(&[NO_LINK; 8]);
        queue.push_back(goal_key);

        while let Some(key) = queue.pop_front() {
            let idx = index[&key];
            let counts = decode(key);
            let blank_row = blank_row(&counts);
            let depth = values[idx as usize];

            for goal_row in 0..ROW_SIZE {
                // forward: blank moves to the row below, one tile moves up
                if blank_row < ROW_SIZE - 1 && counts[blank_row + 1][goal_row] > 0 {
                    let mut next = counts;
                    next[blank_row + 1][goal_row] -= 1;
                    next[blank_row][goal_row] += 1;
                    let nidx = intern(
                        encode(&next),
                        depth + 1,
                        &mut index,
                        &mut values,
                        &mut links,
                        &mut queue,
                    );
                    links[idx as usize * 8 + goal_row * 2] = nidx;
                }
                // backward: blank moves to the row above, one tile moves down
                if blank_row > 0 && counts[blank_row - 1][goal_row] > 0 {
                    let mut next = counts;
                    next[blank_row - 1][goal_row] -= 1;
                    next[blank_row][goal_row] += 1;
                    let nidx = intern(
                        encode(&next),
                        depth + 1,
                        &mut index,
                        &mut values,
                        &mut links,
                        &mut queue,
                    );
                    links[idx as usize * 8 + goal_row * 2 + 1] = nidx;
                }
            }
        }

        WalkingDistance {
            index,
            values,
            links,
        }
    }

    /// Number of interned states.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Walking-distance value of a state.
    #[inline(always)]
    pub fn value(&self, idx: u32) -> u8 {
        self.values[idx as usize]
    }

    /// Successor state after one vertical blank-move. `goal_row` is the
    /// goal row of the tile that crosses into the blank's row; `forward`
    /// means the blank's row index increases.
    #[inline(always)]
    pub fn next_index(&self, idx: u32, goal_row: usize, forward: bool) -> u32 {
        let link = self.links[idx as usize * 8 + goal_row * 2 + usize::from(!forward)];
        debug_assert_ne!(link, NO_LINK, "transition leaves the state space");
        link
    }

    /// State index of a tile array's row projection. Pass the symmetry-twin
    /// tiles to obtain the column projection.
    pub fn index_of(&self, tiles: &[u8; SIZE]) -> u32 {
        let mut counts: Counts = [[0; ROW_SIZE]; ROW_SIZE];
        for (pos, &value) in tiles.iter().enumerate() {
            if value != 0 {
                counts[pos / ROW_SIZE][(value as usize - 1) / ROW_SIZE] += 1;
            }
        }
        *self
            .index
            .get(&encode(&counts))
            .expect("row projection outside the walking-distance space")
    }
}

fn intern(
    key: u64,
    depth: u8,
    index: &mut FxHashMap<u64, u32>,
    values: &mut Vec<u8>,
    links: &mut Vec<u32>,
    queue: &mut VecDeque<u64>,
) -> u32 {
    if let Some(&idx) = index.get(&key) {
        return idx;
    }
    let idx = values.len() as u32;
    index.insert(key, idx);
    values.push(depth);
    links.extend_from_slice(&[NO_LINK; 8]);
    queue.push_back(key);
    idx
}

fn goal_counts() -> Counts {
    let mut counts: Counts = [[0; ROW_SIZE]; ROW_SIZE];
    for (row, entry) in counts.iter_mut().enumerate() {
        entry[row] = 4;
    }
    counts[ROW_SIZE - 1][ROW_SIZE - 1] = 3;
    counts
}

// 3 bits per entry, row-major; counts never exceed 4
fn encode(counts: &Counts) -> u64 {
    let mut key = 0u64;
    for row in counts {
        for &count in row {
            key = key << 3 | u64::from(count);
        }
    }
    key
}

fn decode(mut key: u64) -> Counts {
    let mut counts: Counts = [[0; ROW_SIZE]; ROW_SIZE];
    for row in (0..ROW_SIZE).rev() {
        for col in (0..ROW_SIZE).rev() {
            counts[row][col] = (key & 0x7) as u8;
            key >>= 3;
        }
    }
    counts
}

// the blank's row is the only one holding three tiles
fn blank_row(counts: &Counts) -> usize {
    for (row, entry) in counts.iter().enumerate() {
        if entry.iter().sum::<u8>() == 3 {
            return row;
        }
    }
    unreachable!("every state has exactly one three-tile row");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, GOAL, SYM_POS};

    #[test]
    fn test_state_space_size() {
        let wd = WalkingDistance::build();
        assert_eq!(wd.len(), STATE_COUNT);
    }

    #[test]
    fn test_goal_has_value_zero() {
        let wd = WalkingDistance::build();
        let board = Board::from_tiles(&GOAL).unwrap();
        let idx_h = wd.index_of(board.tiles());
        let idx_v = wd.index_of(board.tiles_sym());
        assert_eq!(wd.value(idx_h), 0);
        assert_eq!(wd.value(idx_v), 0);
    }

    #[test]
    fn test_single_vertical_move_costs_one() {
        // blank moved up once: tile 12 sits one row below its goal row
        let board =
            Board::from_tiles(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0, 13, 14, 15, 12]).unwrap();
        let wd = WalkingDistance::build();
        assert_eq!(wd.value(wd.index_of(board.tiles())), 1);
        assert_eq!(wd.value(wd.index_of(board.tiles_sym())), 0);
    }

    #[test]
    fn test_transition_follows_board_move() {
        let wd = WalkingDistance::build();
        let board =
            Board::from_tiles(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 0, 13, 14, 15, 12]).unwrap();
        let idx = wd.index_of(board.tiles());

        // moving the blank down swaps it with tile 12 (goal row 2)
        let next = wd.next_index(idx, 2, true);
        assert_eq!(wd.value(next), 0);

        let goal = Board::from_tiles(&GOAL).unwrap();
        assert_eq!(next, wd.index_of(goal.tiles()));
    }

    #[test]
    fn test_column_projection_uses_symmetry_twin() {
        // blank moved left once from the goal: a purely horizontal defect
        let board =
            Board::from_tiles(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 0, 15]).unwrap();
        let wd = WalkingDistance::build();
        assert_eq!(wd.value(wd.index_of(board.tiles())), 0);
        assert_eq!(wd.value(wd.index_of(board.tiles_sym())), 1);
        assert_eq!(SYM_POS[board.zero_pos()], 11);
    }
}
