//! The four blank-moves.
//!
//! A move names the direction the blank travels; the displaced tile slides
//! the opposite way. The integer index is stable and shared with the
//! element link tables and the per-direction search summaries.

use std::fmt;

/// Direction of a blank-move, indexed Right=0, Down=1, Left=2, Up=3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    /// Stable integer index into move tables.
    #[inline(always)]
    pub fn index(self) -> usize {
        match self {
            Direction::Right => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Up => 3,
        }
    }

    /// The reverse move, which undoes this one.
    #[inline(always)]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Up => Direction::Down,
        }
    }

    /// The equivalent move on the diagonal symmetry twin: reflection across
    /// the main diagonal swaps horizontal and vertical travel.
    #[inline(always)]
    pub fn transposed(self) -> Direction {
        match self {
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Left => Direction::Up,
            Direction::Up => Direction::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Direction::Right => "Right",
            Direction::Down => "Down",
            Direction::Left => "Left",
            Direction::Up => "Up",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order_is_stable() {
        for (i, dir) in Direction::ALL.iter().enumerate() {
            assert_eq!(dir.index(), i);
        }
    }

    #[test]
    fn test_opposite_is_involution() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.opposite(), dir);
        }
    }

    #[test]
    fn test_transposed_swaps_axes() {
        assert_eq!(Direction::Right.transposed(), Direction::Down);
        assert_eq!(Direction::Up.transposed(), Direction::Left);
        for dir in Direction::ALL {
            assert_eq!(dir.transposed().transposed(), dir);
        }
    }
}
