//! IDA* search engine and solver facade.
//!
//! The engine runs a recursive depth-first search under an iteratively
//! deepened cost bound. Along every edge the heuristic is updated
//! incrementally instead of recomputed: one walking-distance table lookup,
//! a +/-1 Manhattan adjustment with a rescan of the one affected
//! linear-conflict row, or one pattern link-table hop per group. The tile
//! arrays are mutated in place on descent and restored on return.
//!
//! Pruning: the reverse of the previous move is never generated; on a
//! board equal to its diagonal twin only the straight continuation is
//! expanded; and a rolling two-bit "swirl" record blocks the sixth
//! consecutive turn in the same rotational direction. Six same-way turns
//! commit the blank to seven moves spiraling one square, and five moves of
//! the opposite rotation always produce the same board, so no shortest
//! path contains such a run. Top-level move order is chosen per deepening
//! pass from the previous pass's per-direction estimates and node counts.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::board::{Board, MAX_MOVES, ROW_SIZE, SIZE, SYM_POS};
use crate::direction::Direction;
use crate::heuristic::{manhattan_with_conflicts, row_conflicts, HeuristicKind};
use crate::oracle::ReferenceOracle;
use crate::pattern::{GroupState, Pattern, PatternDb, MAX_GROUPS};
use crate::persistence::DATABASE_DIR;
use crate::walking::WalkingDistance;

const END_OF_SEARCH: u32 = u32::MAX;

// two bits per turn; straight moves reset the record
const CW_KEY: u32 = 0x1;
const CCW_KEY: u32 = 0x2;
const RESET_KEY: u32 = 0;

// five identical turns in the ten-bit window block a sixth
#[inline(always)]
fn valid_clockwise(swirl: u32) -> bool {
    swirl & 0x3FF != 0x155
}

#[inline(always)]
fn valid_counter_clockwise(swirl: u32) -> bool {
    swirl & 0x3FF != 0x2AA
}

// cell offset of the displaced tile from the blank, in the regular and
// symmetry-twin arrays
#[inline(always)]
fn tile_offsets(dir: Direction) -> (isize, isize) {
    match dir {
        Direction::Right => (1, 4),
        Direction::Down => (4, 1),
        Direction::Left => (-1, -4),
        Direction::Up => (-4, -1),
    }
}

#[inline(always)]
fn step(dir: Direction, x: usize, y: usize) -> (usize, usize) {
    match dir {
        Direction::Right => (x + 1, y),
        Direction::Down => (x, y + 1),
        Direction::Left => (x - 1, y),
        Direction::Up => (x, y - 1),
    }
}

/// Outcome of one `find_optimal_path` call.
#[derive(Clone, Debug)]
pub struct SolveResult {
    /// A shortest move sequence to the goal; `None` when the board is
    /// unsolvable or the search timed out.
    pub moves: Option<Vec<Direction>>,
    /// Nodes expanded across all deepening passes.
    pub nodes_searched: u64,
    /// True when the search hit its time limit before finishing.
    pub timed_out: bool,
}

impl SolveResult {
    /// Length of the found solution, 0 when there is none.
    pub fn steps(&self) -> u8 {
        self.moves.as_ref().map_or(0, |moves| moves.len() as u8)
    }
}

enum Stack {
    Wd,
    WdMd,
    Pdb(PatternDb),
}

/// Optimal solver facade tying board, heuristic tables, and search
/// together. Construction loads (or generates) every table the selected
/// heuristic needs; solving itself never touches the filesystem.
pub struct Solver {
    stack: Stack,
    wd: WalkingDistance,
    timeout: Option<Duration>,
    oracle: Option<Box<dyn ReferenceOracle>>,
}

impl Solver {
    /// Builds a solver for the given heuristic stack, loading pattern
    /// tables from the `database` directory when the stack needs them.
    pub fn new(kind: HeuristicKind) -> Solver {
        let stack = match kind.pattern() {
            Some(pattern) => Stack::Pdb(PatternDb::load_or_generate(
                Path::new(DATABASE_DIR),
                pattern,
            )),
            None if kind == HeuristicKind::Wd => Stack::Wd,
            None => Stack::WdMd,
        };
        Solver {
            stack,
            wd: WalkingDistance::build(),
            timeout: None,
            oracle: None,
        }
    }

    /// Builds a solver for a custom pattern partition.
    pub fn with_pattern(pattern: Pattern) -> Solver {
        Solver::with_pattern_db(PatternDb::load_or_generate(
            Path::new(DATABASE_DIR),
            pattern,
        ))
    }

    /// Builds a solver around an already constructed pattern database.
    pub fn with_pattern_db(db: PatternDb) -> Solver {
        Solver {
            stack: Stack::Pdb(db),
            wd: WalkingDistance::build(),
            timeout: None,
            oracle: None,
        }
    }

    /// Switches the heuristic stack, loading tables as needed.
    pub fn select_heuristic(&mut self, kind: HeuristicKind) {
        self.stack = match kind.pattern() {
            Some(pattern) => Stack::Pdb(PatternDb::load_or_generate(
                Path::new(DATABASE_DIR),
                pattern,
            )),
            None if kind == HeuristicKind::Wd => Stack::Wd,
            None => Stack::WdMd,
        };
    }

    /// Aborts any later search that runs past the given wall-clock limit.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    pub fn clear_timeout(&mut self) {
        self.timeout = None;
    }

    /// Attaches a reference oracle consulted before and after each search.
    pub fn set_oracle(&mut self, oracle: Box<dyn ReferenceOracle>) {
        self.oracle = Some(oracle);
    }

    /// Admissible heuristic value of a board, `None` when unsolvable.
    pub fn heuristic(&self, board: &Board) -> Option<u8> {
        if !board.is_solvable() {
            return None;
        }
        let wd = u32::from(self.wd.value(self.wd.index_of(board.tiles())))
            + u32::from(self.wd.value(self.wd.index_of(board.tiles_sym())));
        let value = match &self.stack {
            Stack::Wd => wd,
            Stack::WdMd => wd.max(manhattan_with_conflicts(board.tiles(), board.tiles_sym())),
            Stack::Pdb(db) => wd
                .max(manhattan_with_conflicts(board.tiles(), board.tiles_sym()))
                .max(db.board_value(board.tiles()))
                .max(db.board_value(board.tiles_sym())),
        };
        Some(value as u8)
    }

    /// Finds a shortest move sequence transforming `board` into the goal.
    pub fn find_optimal_path(&self, board: &Board) -> SolveResult {
        let Some(h0) = self.heuristic(board) else {
            return SolveResult {
                moves: None,
                nodes_searched: 0,
                timed_out: false,
            };
        };
        if board.is_goal() {
            return SolveResult {
                moves: Some(Vec::new()),
                nodes_searched: 0,
                timed_out: false,
            };
        }

        // a known board tightens the initial bound and may contribute a
        // guaranteed solution prefix
        let mut limit = u32::from(h0);
        let mut prefix: Vec<Direction> = Vec::new();
        let mut start = board.clone();
        let mut known = false;
        if let Some(oracle) = &self.oracle {
            if let Some(entry) = oracle.lookup(board) {
                known = true;
                limit = limit.max(u32::from(entry.estimate));
                for dir in entry.partial_moves {
                    match start.shift(dir) {
                        Some(next) => {
                            prefix.push(dir);
                            start = next;
                            limit = limit.saturating_sub(1);
                        }
                        None => break,
                    }
                }
            }
        }
        if start.is_goal() {
            return SolveResult {
                moves: Some(prefix),
                nodes_searched: 0,
                timed_out: false,
            };
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let pdb = match &self.stack {
            Stack::Pdb(db) => Some(db),
            _ => None,
        };
        let mut search = SearchContext::new(&self.wd, pdb, &start, deadline);
        match pdb {
            Some(_) => search.run_pdb(limit),
            None => search.run_wdmd(limit),
        }

        if search.solved {
            let mut moves = prefix;
            moves.extend_from_slice(&search.solution[1..=search.steps as usize]);
            if let Some(oracle) = &self.oracle {
                if !known {
                    oracle.submit(board, &moves);
                }
            }
            SolveResult {
                moves: Some(moves),
                nodes_searched: search.nodes_total,
                timed_out: false,
            }
        } else {
            SolveResult {
                moves: None,
                nodes_searched: search.nodes_total,
                timed_out: search.timed_out,
            }
        }
    }
}

/// Cached walking-distance and Manhattan/linear-conflict decomposition,
/// copied per recursion frame and rebuilt incrementally per edge.
#[derive(Clone, Copy)]
struct WdMdEstimate {
    mdlc: u32,
    idx_h: u32,
    idx_v: u32,
    val_h: u32,
    val_v: u32,
}

/// Per-group pattern states of the board and of its symmetry twin.
#[derive(Clone, Copy)]
struct PdbEstimate {
    reg: [GroupState; MAX_GROUPS],
    sym: [GroupState; MAX_GROUPS],
    reg_vals: [u8; MAX_GROUPS],
    sym_vals: [u8; MAX_GROUPS],
    reg_sum: u32,
    sym_sum: u32,
}

struct SearchContext<'a> {
    wd: &'a WalkingDistance,
    pdb: Option<&'a PatternDb>,
    tiles: [u8; SIZE],
    tiles_sym: [u8; SIZE],
    root_x: usize,
    root_y: usize,
    solution: [Direction; MAX_MOVES + 1],
    // per-direction estimate and node count from the previous pass
    estimates: [u32; 4],
    node_counts: [u64; 4],
    steps: u8,
    solved: bool,
    terminated: bool,
    timed_out: bool,
    nodes_pass: u64,
    nodes_total: u64,
    deadline: Option<Instant>,
}

impl<'a> SearchContext<'a> {
    fn new(
        wd: &'a WalkingDistance,
        pdb: Option<&'a PatternDb>,
        board: &Board,
        deadline: Option<Instant>,
    ) -> SearchContext<'a> {
        let mut estimates = [END_OF_SEARCH; 4];
        for (estimate, valid) in estimates.iter_mut().zip(board.valid_moves()) {
            if valid {
                *estimate = 0;
            }
        }
        SearchContext {
            wd,
            pdb,
            tiles: *board.tiles(),
            tiles_sym: *board.tiles_sym(),
            root_x: board.zero_x(),
            root_y: board.zero_y(),
            solution: [Direction::Right; MAX_MOVES + 1],
            estimates,
            node_counts: [0; 4],
            steps: 0,
            solved: false,
            terminated: false,
            timed_out: false,
            nodes_pass: 0,
            nodes_total: 0,
            deadline,
        }
    }

    fn goal_reached(&mut self, dir: Direction, cost: usize) -> u32 {
        self.solution[cost] = dir;
        self.steps = cost as u8;
        self.solved = true;
        self.terminated = true;
        END_OF_SEARCH
    }

    #[inline(always)]
    fn poll_deadline(&mut self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out = true;
                self.terminated = true;
                return true;
            }
        }
        false
    }

    // picks the next top-level direction by ascending previous-pass
    // estimate, breaking ties on fewer nodes
    fn pick_direction(&self, remaining: &[u32; 4]) -> Option<usize> {
        let mut best = None;
        let mut best_estimate = END_OF_SEARCH;
        let mut best_nodes = u64::MAX;
        for i in 0..4 {
            if remaining[i] == END_OF_SEARCH {
                continue;
            }
            if self.estimates[i] < best_estimate {
                best_estimate = self.estimates[i];
                best_nodes = self.node_counts[i];
                best = Some(i);
            } else if self.estimates[i] == best_estimate && self.node_counts[i] < best_nodes {
                best_nodes = self.node_counts[i];
                best = Some(i);
            }
        }
        best
    }

    // ------------------------------------------------------------------
    // walking distance + Manhattan/linear conflict
    // ------------------------------------------------------------------

    fn run_wdmd(&mut self, mut limit: u32) {
        let idx_h = self.wd.index_of(&self.tiles);
        let idx_v = self.wd.index_of(&self.tiles_sym);
        let est = WdMdEstimate {
            mdlc: manhattan_with_conflicts(&self.tiles, &self.tiles_sym),
            idx_h,
            idx_v,
            val_h: u32::from(self.wd.value(idx_h)),
            val_v: u32::from(self.wd.value(idx_v)),
        };
        while limit <= MAX_MOVES as u32 {
            self.nodes_pass = 0;
            self.dfs_starting_order_wdmd(limit, est);
            self.nodes_total += self.nodes_pass;
            if self.solved || self.timed_out {
                return;
            }
            limit += 2;
        }
    }

    fn dfs_starting_order_wdmd(&mut self, limit: u32, est: WdMdEstimate) {
        let mut remaining = self.estimates;
        while !self.terminated {
            let Some(pick) = self.pick_direction(&remaining) else {
                return;
            };
            let start_nodes = self.nodes_pass;
            self.nodes_pass += 1;
            let (x, y) = (self.root_x, self.root_y);
            let returned = match Direction::ALL[pick] {
                Direction::Right => self.shift_right(x, y, 1, limit, est, RESET_KEY),
                Direction::Down => self.shift_down(x, y, 1, limit, est, RESET_KEY),
                Direction::Left => self.shift_left(x, y, 1, limit, est, RESET_KEY),
                Direction::Up => self.shift_up(x, y, 1, limit, est, RESET_KEY),
            };
            self.estimates[pick] = returned;
            self.node_counts[pick] = self.nodes_pass - start_nodes;
            remaining[pick] = END_OF_SEARCH;
        }
    }

    fn recursive_dfs_wdmd(
        &mut self,
        x: usize,
        y: usize,
        cost: usize,
        limit: u32,
        est: WdMdEstimate,
        swirl: u32,
    ) -> u32 {
        self.nodes_pass += 1;
        if self.terminated || self.poll_deadline() {
            return END_OF_SEARCH;
        }

        let zero_pos = y * ROW_SIZE + x;
        let zero_sym = SYM_POS[zero_pos];
        let cost1 = cost + 1;
        let mut estimate = est.mdlc.min(est.val_h + est.val_v);
        let non_identical = zero_pos != zero_sym || self.tiles != self.tiles_sym;

        match self.solution[cost] {
            Direction::Right => {
                if x < ROW_SIZE - 1 {
                    estimate = estimate.min(self.shift_right(x, y, cost1, limit, est, RESET_KEY));
                }
                if non_identical {
                    if y > 0 && valid_counter_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_up(x, y, cost1, limit, est, swirl << 2 | CCW_KEY));
                    }
                    if y < ROW_SIZE - 1 && valid_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_down(x, y, cost1, limit, est, swirl << 2 | CW_KEY));
                    }
                }
            }
            Direction::Down => {
                if y < ROW_SIZE - 1 {
                    estimate = estimate.min(self.shift_down(x, y, cost1, limit, est, RESET_KEY));
                }
                if non_identical {
                    if x > 0 && valid_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_left(x, y, cost1, limit, est, swirl << 2 | CW_KEY));
                    }
                    if x < ROW_SIZE - 1 && valid_counter_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_right(x, y, cost1, limit, est, swirl << 2 | CCW_KEY));
                    }
                }
            }
            Direction::Left => {
                if x > 0 {
                    estimate = estimate.min(self.shift_left(x, y, cost1, limit, est, RESET_KEY));
                }
                if non_identical {
                    if y < ROW_SIZE - 1 && valid_counter_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_down(x, y, cost1, limit, est, swirl << 2 | CCW_KEY));
                    }
                    if y > 0 && valid_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_up(x, y, cost1, limit, est, swirl << 2 | CW_KEY));
                    }
                }
            }
            Direction::Up => {
                if y > 0 {
                    estimate = estimate.min(self.shift_up(x, y, cost1, limit, est, RESET_KEY));
                }
                if non_identical {
                    if x < ROW_SIZE - 1 && valid_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_right(x, y, cost1, limit, est, swirl << 2 | CW_KEY));
                    }
                    if x > 0 && valid_counter_clockwise(swirl) {
                        estimate = estimate
                            .min(self.shift_left(x, y, cost1, limit, est, swirl << 2 | CCW_KEY));
                    }
                }
            }
        }
        estimate
    }

    fn shift_right(
        &mut self,
        x: usize,
        y: usize,
        cost1: usize,
        limit: u32,
        est: WdMdEstimate,
        swirl: u32,
    ) -> u32 {
        if self.terminated {
            return END_OF_SEARCH;
        }
        let zero_pos = y * ROW_SIZE + x;
        let tile = self.tiles[zero_pos + 1] as usize;
        let new_idx_v = self.wd.next_index(est.idx_v, (tile - 1) % ROW_SIZE, true);
        let new_val_v = u32::from(self.wd.value(new_idx_v));
        let priority_wd = est.val_h + new_val_v;
        if priority_wd == 0 {
            return self.goal_reached(Direction::Right, cost1);
        }
        let estimate = (est.val_h + est.val_v).max(est.mdlc);
        if priority_wd < limit {
            // the vertical aspects of this move live on the symmetry twin
            let zero_sym = SYM_POS[zero_pos];
            let value = self.tiles_sym[zero_sym + ROW_SIZE];
            let goal_row = (value as usize - 1) / ROW_SIZE;
            let mdlc = if goal_row > x { est.mdlc + 1 } else { est.mdlc - 1 };
            let mdlc = update_row_conflicts(&mut self.tiles_sym, y, x, goal_row, mdlc, value, 1);
            if priority_wd.max(mdlc) < limit {
                self.solution[cost1] = Direction::Right;
                let next = WdMdEstimate {
                    mdlc,
                    idx_v: new_idx_v,
                    val_v: new_val_v,
                    ..est
                };
                return estimate
                    .min(self.descend_wdmd(Direction::Right, x, y, cost1, limit, next, swirl));
            }
            return mdlc;
        }
        priority_wd
    }

    fn shift_down(
        &mut self,
        x: usize,
        y: usize,
        cost1: usize,
        limit: u32,
        est: WdMdEstimate,
        swirl: u32,
    ) -> u32 {
        if self.terminated {
            return END_OF_SEARCH;
        }
        let zero_pos = y * ROW_SIZE + x;
        let tile = self.tiles[zero_pos + ROW_SIZE] as usize;
        let new_idx_h = self.wd.next_index(est.idx_h, (tile - 1) / ROW_SIZE, true);
        let new_val_h = u32::from(self.wd.value(new_idx_h));
        let priority_wd = est.val_v + new_val_h;
        if priority_wd == 0 {
            return self.goal_reached(Direction::Down, cost1);
        }
        let estimate = (est.val_h + est.val_v).max(est.mdlc);
        if priority_wd < limit {
            let value = self.tiles[zero_pos + ROW_SIZE];
            let goal_row = (value as usize - 1) / ROW_SIZE;
            let mdlc = if goal_row > y { est.mdlc + 1 } else { est.mdlc - 1 };
            let mdlc = update_row_conflicts(&mut self.tiles, x, y, goal_row, mdlc, value, 1);
            if priority_wd.max(mdlc) < limit {
                self.solution[cost1] = Direction::Down;
                let next = WdMdEstimate {
                    mdlc,
                    idx_h: new_idx_h,
                    val_h: new_val_h,
                    ..est
                };
                return estimate
                    .min(self.descend_wdmd(Direction::Down, x, y, cost1, limit, next, swirl));
            }
            return mdlc;
        }
        priority_wd
    }

    fn shift_left(
        &mut self,
        x: usize,
        y: usize,
        cost1: usize,
        limit: u32,
        est: WdMdEstimate,
        swirl: u32,
    ) -> u32 {
        if self.terminated {
            return END_OF_SEARCH;
        }
        let zero_pos = y * ROW_SIZE + x;
        let tile = self.tiles[zero_pos - 1] as usize;
        let new_idx_v = self.wd.next_index(est.idx_v, (tile - 1) % ROW_SIZE, false);
        let new_val_v = u32::from(self.wd.value(new_idx_v));
        let priority_wd = est.val_h + new_val_v;
        if priority_wd == 0 {
            return self.goal_reached(Direction::Left, cost1);
        }
        let estimate = (est.val_h + est.val_v).max(est.mdlc);
        if priority_wd < limit {
            let zero_sym = SYM_POS[zero_pos];
            let value = self.tiles_sym[zero_sym - ROW_SIZE];
            let goal_row = (value as usize - 1) / ROW_SIZE;
            let mdlc = if goal_row < x { est.mdlc + 1 } else { est.mdlc - 1 };
            let mdlc = update_row_conflicts(&mut self.tiles_sym, y, x, goal_row, mdlc, value, -1);
            if priority_wd.max(mdlc) < limit {
                self.solution[cost1] = Direction::Left;
                let next = WdMdEstimate {
                    mdlc,
                    idx_v: new_idx_v,
                    val_v: new_val_v,
                    ..est
                };
                return estimate
                    .min(self.descend_wdmd(Direction::Left, x, y, cost1, limit, next, swirl));
            }
            return mdlc;
        }
        priority_wd
    }

    fn shift_up(
        &mut self,
        x: usize,
        y: usize,
        cost1: usize,
        limit: u32,
        est: WdMdEstimate,
        swirl: u32,
    ) -> u32 {
        if self.terminated {
            return END_OF_SEARCH;
        }
        let zero_pos = y * ROW_SIZE + x;
        let tile = self.tiles[zero_pos - ROW_SIZE] as usize;
        let new_idx_h = self.wd.next_index(est.idx_h, (tile - 1) / ROW_SIZE, false);
        let new_val_h = u32::from(self.wd.value(new_idx_h));
        let priority_wd = est.val_v + new_val_h;
        if priority_wd == 0 {
            return self.goal_reached(Direction::Up, cost1);
        }
        let estimate = (est.val_h + est.val_v).max(est.mdlc);
        if priority_wd < limit {
            let value = self.tiles[zero_pos - ROW_SIZE];
            let goal_row = (value as usize - 1) / ROW_SIZE;
            let mdlc = if goal_row < y { est.mdlc + 1 } else { est.mdlc - 1 };
            let mdlc = update_row_conflicts(&mut self.tiles, x, y, goal_row, mdlc, value, -1);
            if priority_wd.max(mdlc) < limit {
                self.solution[cost1] = Direction::Up;
                let next = WdMdEstimate {
                    mdlc,
                    idx_h: new_idx_h,
                    val_h: new_val_h,
                    ..est
                };
                return estimate
                    .min(self.descend_wdmd(Direction::Up, x, y, cost1, limit, next, swirl));
            }
            return mdlc;
        }
        priority_wd
    }

    // applies the move in place, recurses one level deeper, and restores
    fn descend_wdmd(
        &mut self,
        dir: Direction,
        x: usize,
        y: usize,
        cost: usize,
        limit: u32,
        est: WdMdEstimate,
        swirl: u32,
    ) -> u32 {
        let zero_pos = y * ROW_SIZE + x;
        let zero_sym = SYM_POS[zero_pos];
        let (tile_offset, sym_offset) = tile_offsets(dir);
        let next_pos = (zero_pos as isize + tile_offset) as usize;
        let next_sym = (zero_sym as isize + sym_offset) as usize;
        let (new_x, new_y) = step(dir, x, y);

        self.tiles[zero_pos] = self.tiles[next_pos];
        self.tiles[next_pos] = 0;
        self.tiles_sym[zero_sym] = self.tiles_sym[next_sym];
        self.tiles_sym[next_sym] = 0;
        let result = self.recursive_dfs_wdmd(new_x, new_y, cost, limit - 1, est, swirl);
        self.tiles[next_pos] = self.tiles[zero_pos];
        self.tiles[zero_pos] = 0;
        self.tiles_sym[next_sym] = self.tiles_sym[zero_sym];
        self.tiles_sym[zero_sym] = 0;
        result
    }

    // ------------------------------------------------------------------
    // pattern database
    // ------------------------------------------------------------------

    fn run_pdb(&mut self, mut limit: u32) {
        let db = self.pdb.expect("pattern stack without a database");
        let reg = db.states_of(&self.tiles);
        let sym = db.states_of(&self.tiles_sym);
        let mut est = PdbEstimate {
            reg,
            sym,
            reg_vals: [0; MAX_GROUPS],
            sym_vals: [0; MAX_GROUPS],
            reg_sum: 0,
            sym_sum: 0,
        };
        for gi in 0..db.group_count() {
            est.reg_vals[gi] = db.value(gi, reg[gi]);
            est.sym_vals[gi] = db.value(gi, sym[gi]);
            est.reg_sum += u32::from(est.reg_vals[gi]);
            est.sym_sum += u32::from(est.sym_vals[gi]);
        }

        while limit <= MAX_MOVES as u32 {
            self.nodes_pass = 0;
            self.dfs_starting_order_pdb(limit, est);
            self.nodes_total += self.nodes_pass;
            if self.solved || self.timed_out {
                return;
            }
            limit += 2;
        }
    }

    fn dfs_starting_order_pdb(&mut self, limit: u32, est: PdbEstimate) {
        let mut remaining = self.estimates;
        while !self.terminated {
            let Some(pick) = self.pick_direction(&remaining) else {
                return;
            };
            let start_nodes = self.nodes_pass;
            self.nodes_pass += 1;
            let (x, y) = (self.root_x, self.root_y);
            let returned =
                self.shift_pdb(Direction::ALL[pick], x, y, 1, limit, est, RESET_KEY);
            self.estimates[pick] = returned;
            self.node_counts[pick] = self.nodes_pass - start_nodes;
            remaining[pick] = END_OF_SEARCH;
        }
    }

    fn recursive_dfs_pdb(
        &mut self,
        x: usize,
        y: usize,
        cost: usize,
        limit: u32,
        est: PdbEstimate,
        swirl: u32,
    ) -> u32 {
        self.nodes_pass += 1;
        if self.terminated || self.poll_deadline() {
            return END_OF_SEARCH;
        }

        let zero_pos = y * ROW_SIZE + x;
        let zero_sym = SYM_POS[zero_pos];
        let cost1 = cost + 1;
        let mut estimate = est.reg_sum.max(est.sym_sum);
        let non_identical = zero_pos != zero_sym || self.tiles != self.tiles_sym;

        match self.solution[cost] {
            Direction::Right => {
                if x < ROW_SIZE - 1 {
                    estimate = estimate.min(self.shift_pdb(
                        Direction::Right,
                        x,
                        y,
                        cost1,
                        limit,
                        est,
                        RESET_KEY,
                    ));
                }
                if non_identical {
                    if y > 0 && valid_counter_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Up,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CCW_KEY,
                        ));
                    }
                    if y < ROW_SIZE - 1 && valid_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Down,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CW_KEY,
                        ));
                    }
                }
            }
            Direction::Down => {
                if y < ROW_SIZE - 1 {
                    estimate = estimate.min(self.shift_pdb(
                        Direction::Down,
                        x,
                        y,
                        cost1,
                        limit,
                        est,
                        RESET_KEY,
                    ));
                }
                if non_identical {
                    if x > 0 && valid_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Left,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CW_KEY,
                        ));
                    }
                    if x < ROW_SIZE - 1 && valid_counter_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Right,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CCW_KEY,
                        ));
                    }
                }
            }
            Direction::Left => {
                if x > 0 {
                    estimate = estimate.min(self.shift_pdb(
                        Direction::Left,
                        x,
                        y,
                        cost1,
                        limit,
                        est,
                        RESET_KEY,
                    ));
                }
                if non_identical {
                    if y < ROW_SIZE - 1 && valid_counter_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Down,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CCW_KEY,
                        ));
                    }
                    if y > 0 && valid_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Up,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CW_KEY,
                        ));
                    }
                }
            }
            Direction::Up => {
                if y > 0 {
                    estimate = estimate.min(self.shift_pdb(
                        Direction::Up,
                        x,
                        y,
                        cost1,
                        limit,
                        est,
                        RESET_KEY,
                    ));
                }
                if non_identical {
                    if x < ROW_SIZE - 1 && valid_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Right,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CW_KEY,
                        ));
                    }
                    if x > 0 && valid_counter_clockwise(swirl) {
                        estimate = estimate.min(self.shift_pdb(
                            Direction::Left,
                            x,
                            y,
                            cost1,
                            limit,
                            est,
                            swirl << 2 | CCW_KEY,
                        ));
                    }
                }
            }
        }
        estimate
    }

    fn shift_pdb(
        &mut self,
        dir: Direction,
        x: usize,
        y: usize,
        cost1: usize,
        limit: u32,
        est: PdbEstimate,
        swirl: u32,
    ) -> u32 {
        if self.terminated {
            return END_OF_SEARCH;
        }
        let db = self.pdb.expect("pattern stack without a database");
        let zero_pos = y * ROW_SIZE + x;
        let zero_sym = SYM_POS[zero_pos];
        let (tile_offset, sym_offset) = tile_offsets(dir);
        let next_pos = (zero_pos as isize + tile_offset) as usize;

        // the displaced tile belongs to exactly one group; one link-table
        // hop updates that group's compressed state
        let tile = self.tiles[next_pos];
        let gi = db.group_of(tile);
        let group = db.elements().group(db.group_size(gi));
        let entry = group.link_move(est.reg[gi].fmt_idx, zero_pos, dir.index());
        let code = (entry & 0xF) as usize;
        let new_reg = GroupState {
            key_idx: if code == 0 {
                est.reg[gi].key_idx
            } else {
                group.rotate_key(est.reg[gi].key_idx, (entry >> 4 & 0xF) as usize, code)
            },
            fmt_idx: entry >> 8,
        };
        let new_reg_val = db.value(gi, new_reg);
        let reg_sum = est.reg_sum - u32::from(est.reg_vals[gi]) + u32::from(new_reg_val);
        if reg_sum == 0 {
            return self.goal_reached(dir, cost1);
        }

        let estimate = est.reg_sum.max(est.sym_sum);
        if reg_sum < limit {
            // mirror the move on the symmetry twin's groups
            let next_sym = (zero_sym as isize + sym_offset) as usize;
            let sym_tile = self.tiles_sym[next_sym];
            let gj = db.group_of(sym_tile);
            let sym_group = db.elements().group(db.group_size(gj));
            let sym_entry =
                sym_group.link_move(est.sym[gj].fmt_idx, zero_sym, dir.transposed().index());
            let sym_code = (sym_entry & 0xF) as usize;
            let new_sym = GroupState {
                key_idx: if sym_code == 0 {
                    est.sym[gj].key_idx
                } else {
                    sym_group.rotate_key(
                        est.sym[gj].key_idx,
                        (sym_entry >> 4 & 0xF) as usize,
                        sym_code,
                    )
                },
                fmt_idx: sym_entry >> 8,
            };
            let new_sym_val = db.value(gj, new_sym);
            let sym_sum = est.sym_sum - u32::from(est.sym_vals[gj]) + u32::from(new_sym_val);

            if reg_sum.max(sym_sum) < limit {
                self.solution[cost1] = dir;
                let mut next = est;
                next.reg[gi] = new_reg;
                next.reg_vals[gi] = new_reg_val;
                next.reg_sum = reg_sum;
                next.sym[gj] = new_sym;
                next.sym_vals[gj] = new_sym_val;
                next.sym_sum = sym_sum;
                return estimate.min(self.descend_pdb(dir, x, y, cost1, limit, next, swirl));
            }
            return reg_sum.max(sym_sum);
        }
        reg_sum
    }

    fn descend_pdb(
        &mut self,
        dir: Direction,
        x: usize,
        y: usize,
        cost: usize,
        limit: u32,
        est: PdbEstimate,
        swirl: u32,
    ) -> u32 {
        let zero_pos = y * ROW_SIZE + x;
        let zero_sym = SYM_POS[zero_pos];
        let (tile_offset, sym_offset) = tile_offsets(dir);
        let next_pos = (zero_pos as isize + tile_offset) as usize;
        let next_sym = (zero_sym as isize + sym_offset) as usize;
        let (new_x, new_y) = step(dir, x, y);

        self.tiles[zero_pos] = self.tiles[next_pos];
        self.tiles[next_pos] = 0;
        self.tiles_sym[zero_sym] = self.tiles_sym[next_sym];
        self.tiles_sym[next_sym] = 0;
        let result = self.recursive_dfs_pdb(new_x, new_y, cost, limit - 1, est, swirl);
        self.tiles[next_pos] = self.tiles[zero_pos];
        self.tiles[zero_pos] = 0;
        self.tiles_sym[next_sym] = self.tiles_sym[zero_sym];
        self.tiles_sym[zero_sym] = 0;
        result
    }
}

// Rescans the linear conflicts of the one row a vertical move can affect:
// the moving tile's goal row, when that row is either the tile's source or
// its destination. Horizontal moves go through the symmetry twin with the
// axes swapped.
fn update_row_conflicts(
    tiles: &mut [u8; SIZE],
    x: usize,
    y: usize,
    goal_row: usize,
    mdlc: u32,
    value: u8,
    diff: isize,
) -> u32 {
    if goal_row == y {
        // tile enters its goal row at (y, x)
        let mut updated = mdlc - row_conflicts(tiles, goal_row);
        tiles[y * ROW_SIZE + x] = value;
        updated += row_conflicts(tiles, goal_row);
        tiles[y * ROW_SIZE + x] = 0;
        updated
    } else if goal_row as isize == y as isize + diff {
        // tile leaves its goal row
        let source = goal_row;
        let mut updated = mdlc - row_conflicts(tiles, source);
        tiles[source * ROW_SIZE + x] = 0;
        updated += row_conflicts(tiles, source);
        tiles[source * ROW_SIZE + x] = value;
        updated
    } else {
        mdlc
    }
}
