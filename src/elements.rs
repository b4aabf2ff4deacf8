//! Pattern element tables.
//!
//! A pattern group of size g tracks g tiles through a compressed state:
//! the "format" is the 16-bit bitmap of the positions the group occupies
//! (one of C(16, g) values) and the "key" is the in-group ordering of its
//! tiles over those positions in scan order (one of g! permutations, packed
//! four bits per slot). The tables generated here drive every pattern
//! lookup in constant time:
//!
//! - `keys2combo` / `formats2combo`: index -> packed value, sorted by the
//!   packed integer so indices are identical across runs and platforms.
//! - `rotate_key_by_pos`: effect on the key when one tile's slot moves past
//!   1..=3 other group tiles during a vertical move.
//! - `link_format_combo` / `link_format_move`: effect of each blank-move on
//!   the format bitmap, with a key-shift code selecting the rotation entry.
//!
//! Key-shift codes: 0 means no group tile was crossed; odd codes 1, 3, 5
//! record a blank-move Down crossing 1..=3 group tiles (the tile's slot
//! rank decreases); even codes 2, 4, 6 record a blank-move Up crossing
//! (slot rank increases). The rotation table is indexed by `code - 1`.

use rustc_hash::FxHashMap;

use crate::board::SIZE;

/// Largest supported group size.
pub const MAX_GROUP: usize = 8;

/// Key count per group size: g!.
pub const KEY_COUNT: [usize; 9] = [0, 1, 2, 6, 24, 120, 720, 5040, 40320];

/// Format count per group size: C(16, g).
pub const FORMAT_COUNT: [usize; 9] = [0, 16, 120, 560, 1820, 4368, 8008, 11440, 12870];

/// Twice the maximum key shift per group size: a moving tile can cross at
/// most min(g - 1, 3) other group tiles.
pub const MAX_SHIFT_X2: [usize; 9] = [0, 0, 2, 4, 6, 6, 6, 6, 6];

/// Group sizes persisted by default; patterns draw from {3, 5, 6, 7, 8}.
pub const STANDARD_GROUPS: [usize; 5] = [3, 5, 6, 7, 8];

/// Bit assigned to each board position in a format bitmap.
pub const BIT_POS_16: [u32; SIZE] = {
    let mut bits = [0u32; SIZE];
    let mut pos = 0;
    while pos < SIZE {
        bits[pos] = 1 << (SIZE - 1 - pos);
        pos += 1;
    }
    bits
};

/// Element tables for one group size.
pub struct GroupElements {
    pub size: usize,
    pub keys2combo: Vec<u32>,
    pub rotate_key_by_pos: Vec<u32>,
    pub formats2combo: Vec<u32>,
    pub link_format_move: Vec<u32>,
    pub link_format_combo: Vec<u32>,
    key_index: FxHashMap<u32, u32>,
    format_index: FxHashMap<u32, u32>,
}

impl GroupElements {
    /// Rebuilds the index maps from raw tables (generation and file load).
    pub fn from_tables(
        size: usize,
        keys2combo: Vec<u32>,
        rotate_key_by_pos: Vec<u32>,
        formats2combo: Vec<u32>,
        link_format_move: Vec<u32>,
        link_format_combo: Vec<u32>,
    ) -> GroupElements {
        let key_index = keys2combo
            .iter()
            .enumerate()
            .map(|(i, &combo)| (combo, i as u32))
            .collect();
        let format_index = formats2combo
            .iter()
            .enumerate()
            .map(|(i, &combo)| (combo, i as u32))
            .collect();
        GroupElements {
            size,
            keys2combo,
            rotate_key_by_pos,
            formats2combo,
            link_format_move,
            link_format_combo,
            key_index,
            format_index,
        }
    }

    /// Index of a packed key permutation.
    #[inline]
    pub fn key_index(&self, packed: u32) -> u32 {
        self.key_index[&packed]
    }

    /// Index of a format bitmap.
    #[inline]
    pub fn format_index(&self, bitmap: u32) -> u32 {
        self.format_index[&bitmap]
    }

    /// Key index after the tile in `slot` shifts per a link-table code.
    #[inline(always)]
    pub fn rotate_key(&self, key_idx: u32, slot: usize, code: usize) -> u32 {
        debug_assert!(code >= 1);
        let stride = MAX_SHIFT_X2[self.size];
        self.rotate_key_by_pos
            [key_idx as usize * self.size * stride + slot * stride + (code - 1)]
    }

    /// Solver-view link entry for a blank at `zero_pos` moving in direction
    /// index `dir`: `(next format index << 8) | (slot << 4) | shift code`.
    #[inline(always)]
    pub fn link_move(&self, format_idx: u32, zero_pos: usize, dir: usize) -> u32 {
        self.link_format_move[format_idx as usize * 64 + zero_pos * 4 + dir]
    }
}

/// Element tables for every generated group size, indexed by size.
pub struct Elements {
    groups: Vec<Option<GroupElements>>,
}

impl Elements {
    /// Generates tables for all group sizes 2..=`max_size`.
    pub fn generate_up_to(max_size: usize) -> Elements {
        assert!((2..=MAX_GROUP).contains(&max_size));
        let key_sets = generate_key_sets(max_size);
        let format_sets = generate_format_sets();

        let mut groups: Vec<Option<GroupElements>> = (0..=MAX_GROUP).map(|_| None).collect();
        for size in 2..=max_size {
            let keys2combo = key_sets[size].clone();
            let formats2combo = format_sets[size].clone();
            let key_index: FxHashMap<u32, u32> = keys2combo
                .iter()
                .enumerate()
                .map(|(i, &k)| (k, i as u32))
                .collect();
            let format_index: FxHashMap<u32, u32> = formats2combo
                .iter()
                .enumerate()
                .map(|(i, &f)| (f, i as u32))
                .collect();

            let rotate_key_by_pos = generate_rotations(size, &keys2combo, &key_index);
            let (link_format_combo, link_format_move) =
                generate_links(size, &formats2combo, &format_index);

            groups[size] = Some(GroupElements {
                size,
                keys2combo,
                rotate_key_by_pos,
                formats2combo,
                link_format_move,
                link_format_combo,
                key_index,
                format_index,
            });
        }
        Elements { groups }
    }

    /// Generates tables for every supported group size.
    pub fn generate() -> Elements {
        Elements::generate_up_to(MAX_GROUP)
    }

    /// Assembles an `Elements` set from individually loaded groups.
    pub fn from_groups(loaded: Vec<GroupElements>) -> Elements {
        let mut groups: Vec<Option<GroupElements>> = (0..=MAX_GROUP).map(|_| None).collect();
        for group in loaded {
            let size = group.size;
            groups[size] = Some(group);
        }
        Elements { groups }
    }

    /// Tables for one group size; panics if that size was never generated.
    #[inline]
    pub fn group(&self, size: usize) -> &GroupElements {
        self.groups[size]
            .as_ref()
            .expect("element tables missing for group size")
    }

    pub fn has(&self, size: usize) -> bool {
        self.groups.get(size).map_or(false, Option::is_some)
    }
}

// Permutations of 0..size as packed nibbles, one sorted set per size,
// grown by inserting the next-largest value at every position.
fn generate_key_sets(max_size: usize) -> Vec<Vec<u32>> {
    let mut sets: Vec<Vec<u32>> = vec![Vec::new(); max_size + 1];
    let mut perms: Vec<Vec<u8>> = vec![vec![0]];

    for new_value in 1..max_size as u8 {
        let mut expanded = Vec::with_capacity(perms.len() * (new_value as usize + 1));
        for perm in &perms {
            for insert_at in 0..=perm.len() {
                let mut next = Vec::with_capacity(perm.len() + 1);
                next.extend_from_slice(&perm[..insert_at]);
                next.push(new_value);
                next.extend_from_slice(&perm[insert_at..]);
                expanded.push(next);
            }
        }
        perms = expanded;

        let size = new_value as usize + 1;
        let mut packed: Vec<u32> = perms.iter().map(|perm| pack_key(perm)).collect();
        packed.sort_unstable();
        debug_assert_eq!(packed.len(), KEY_COUNT[size]);
        sets[size] = packed;
    }
    sets
}

// All C(16, k) bitmaps per popcount k, grown by setting one more bit.
fn generate_format_sets() -> Vec<Vec<u32>> {
    let mut sets: Vec<Vec<u32>> = vec![Vec::new(); MAX_GROUP + 1];
    let mut current: Vec<u32> = vec![0];

    for size in 1..=MAX_GROUP {
        let mut expanded: Vec<u32> = current
            .iter()
            .flat_map(|&bitmap| {
                (0..SIZE)
                    .filter(move |&pos| bitmap & BIT_POS_16[pos] == 0)
                    .map(move |pos| bitmap | BIT_POS_16[pos])
            })
            .collect();
        expanded.sort_unstable();
        expanded.dedup();
        debug_assert_eq!(expanded.len(), FORMAT_COUNT[size]);
        sets[size] = expanded.clone();
        current = expanded;
    }
    sets
}

// For every key, slot, and crossing count: the key reached when that slot's
// tile passes the crossed tiles. Entries interleave left and right moves:
// [left 1, right 1, left 2, right 2, left 3, right 3].
fn generate_rotations(
    size: usize,
    keys2combo: &[u32],
    key_index: &FxHashMap<u32, u32>,
) -> Vec<u32> {
    let stride = MAX_SHIFT_X2[size];
    let shift_max = stride / 2;
    let mut table = vec![0u32; keys2combo.len() * size * stride];

    for (idx, &packed) in keys2combo.iter().enumerate() {
        let nibbles = unpack_key(packed, size);
        for slot in 0..size {
            let base = idx * size * stride + slot * stride;
            for shift in 1..=shift_max {
                if slot + shift < size {
                    // rank increases (blank-move Up crossing): odd entry,
                    // reached from the even codes 2, 4, 6
                    let moved = pack_moved(&nibbles, size, slot, slot + shift);
                    table[base + shift * 2 - 1] = key_index[&moved];
                }
                if slot >= shift {
                    // rank decreases (blank-move Down crossing): even entry,
                    // reached from the odd codes 1, 3, 5
                    let moved = pack_moved(&nibbles, size, slot, slot - shift);
                    table[base + (shift - 1) * 2] = key_index[&moved];
                }
            }
        }
    }
    table
}

// Format transitions for all four blank-moves, in both the generator view
// (indexed by slot) and the solver view (indexed by the blank's position).
fn generate_links(
    size: usize,
    formats2combo: &[u32],
    format_index: &FxHashMap<u32, u32>,
) -> (Vec<u32>, Vec<u32>) {
    let mut combo_view = vec![0u32; formats2combo.len() * size * 4];
    let mut move_view = vec![0u32; formats2combo.len() * 64];

    for (fmt_idx, &bitmap) in formats2combo.iter().enumerate() {
        let mut slot = 0usize;
        for pos in 0..SIZE {
            if bitmap & BIT_POS_16[pos] == 0 {
                continue;
            }
            let cleared = bitmap ^ BIT_POS_16[pos];

            // target cell per direction is the blank's pre-move position
            let mut next = [None::<usize>; 4];
            let mut codes = [0u32; 4];
            if pos % 4 > 0 && bitmap & BIT_POS_16[pos - 1] == 0 {
                next[0] = Some(pos - 1); // Right: tile slides left
            }
            if pos > 3 && bitmap & BIT_POS_16[pos - 4] == 0 {
                next[1] = Some(pos - 4); // Down: tile slides up
                let crossed = (1..4).filter(|&k| bitmap & BIT_POS_16[pos - k] != 0).count();
                if crossed > 0 {
                    codes[1] = crossed as u32 * 2 - 1;
                }
            }
            if pos % 4 < 3 && bitmap & BIT_POS_16[pos + 1] == 0 {
                next[2] = Some(pos + 1); // Left: tile slides right
            }
            if pos < 12 && bitmap & BIT_POS_16[pos + 4] == 0 {
                next[3] = Some(pos + 4); // Up: tile slides down
                let crossed = (1..4).filter(|&k| bitmap & BIT_POS_16[pos + k] != 0).count();
                if crossed > 0 {
                    codes[3] = crossed as u32 * 2;
                }
            }

            for dir in 0..4 {
                if let Some(target) = next[dir] {
                    let next_bitmap = cleared | BIT_POS_16[target];
                    let next_idx = format_index[&next_bitmap];
                    combo_view[fmt_idx * size * 4 + slot * 4 + dir] =
                        next_bitmap << 4 | codes[dir];
                    move_view[fmt_idx * 64 + target * 4 + dir] =
                        next_idx << 8 | (slot as u32) << 4 | codes[dir];
                }
            }
            slot += 1;
        }
    }
    (combo_view, move_view)
}

/// Packs an in-group ordering into nibbles, first slot in the top nibble.
pub fn pack_key(order: &[u8]) -> u32 {
    order.iter().fold(0u32, |acc, &v| acc << 4 | u32::from(v))
}

fn unpack_key(packed: u32, size: usize) -> [u8; MAX_GROUP] {
    let mut nibbles = [0u8; MAX_GROUP];
    for (i, nibble) in nibbles.iter_mut().take(size).enumerate() {
        *nibble = ((packed >> ((size - 1 - i) * 4)) & 0xF) as u8;
    }
    nibbles
}

// repack with the element at `from` removed and reinserted at `to`
fn pack_moved(nibbles: &[u8; MAX_GROUP], size: usize, from: usize, to: usize) -> u32 {
    let mut order = [0u8; MAX_GROUP];
    order[..size].copy_from_slice(&nibbles[..size]);
    let value = order[from];
    if from < to {
        order.copy_within(from + 1..to + 1, from);
    } else {
        order.copy_within(to..from, to + 1);
    }
    order[to] = value;
    pack_key(&order[..size])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_sizes_match_combinatorics() {
        let elements = Elements::generate_up_to(5);
        for size in 2..=5 {
            let group = elements.group(size);
            assert_eq!(group.keys2combo.len(), KEY_COUNT[size]);
            assert_eq!(group.formats2combo.len(), FORMAT_COUNT[size]);
            assert_eq!(
                group.rotate_key_by_pos.len(),
                KEY_COUNT[size] * size * MAX_SHIFT_X2[size]
            );
            assert_eq!(group.link_format_move.len(), FORMAT_COUNT[size] * 64);
            assert_eq!(group.link_format_combo.len(), FORMAT_COUNT[size] * size * 4);
        }
    }

    #[test]
    fn test_key_sets_are_sorted_and_start_at_identity() {
        let elements = Elements::generate_up_to(4);
        for size in 2..=4 {
            let keys = &elements.group(size).keys2combo;
            assert!(keys.windows(2).all(|w| w[0] < w[1]));
            let identity: Vec<u8> = (0..size as u8).collect();
            assert_eq!(keys[0], pack_key(&identity));
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let first = Elements::generate_up_to(5);
        let second = Elements::generate_up_to(5);
        for size in 2..=5 {
            assert_eq!(
                first.group(size).keys2combo,
                second.group(size).keys2combo
            );
            assert_eq!(
                first.group(size).formats2combo,
                second.group(size).formats2combo
            );
            assert_eq!(
                first.group(size).rotate_key_by_pos,
                second.group(size).rotate_key_by_pos
            );
            assert_eq!(
                first.group(size).link_format_move,
                second.group(size).link_format_move
            );
        }
    }

    #[test]
    fn test_rotation_moves_one_slot_past_another() {
        let elements = Elements::generate_up_to(3);
        let group = elements.group(3);
        let from = group.key_index(pack_key(&[0, 1, 2]));
        // slot 0's tile crosses one tile downward (even code 2), so its
        // rank rises by one: [0,1,2] -> [1,0,2]
        let rotated = group.rotate_key(from, 0, 2);
        assert_eq!(group.keys2combo[rotated as usize], pack_key(&[1, 0, 2]));
        // slot 1's tile crosses one tile upward (odd code 1), so its rank
        // drops by one: [0,1,2] -> [1,0,2]
        let rotated = group.rotate_key(from, 1, 1);
        assert_eq!(group.keys2combo[rotated as usize], pack_key(&[1, 0, 2]));
        // slot 0 crossing two tiles downward lands behind both: [0,1,2] -> [1,2,0]
        let rotated = group.rotate_key(from, 0, 4);
        assert_eq!(group.keys2combo[rotated as usize], pack_key(&[1, 2, 0]));
    }

    #[test]
    fn test_link_entries_preserve_popcount_and_stay_adjacent() {
        let elements = Elements::generate_up_to(3);
        let group = elements.group(3);
        for (fmt_idx, &bitmap) in group.formats2combo.iter().enumerate() {
            for slot in 0..3 {
                for dir in 0..4 {
                    let combo = group.link_format_combo[fmt_idx * 12 + slot * 4 + dir];
                    if combo == 0 {
                        continue;
                    }
                    let next_bitmap = combo >> 4;
                    assert_eq!(next_bitmap.count_ones(), 3);
                    // exactly one tile moved one cell
                    assert_eq!((next_bitmap ^ bitmap).count_ones(), 2);
                }
            }
        }
    }

    #[test]
    fn test_move_view_agrees_with_combo_view() {
        let elements = Elements::generate_up_to(3);
        let group = elements.group(3);
        for (fmt_idx, &bitmap) in group.formats2combo.iter().enumerate() {
            let mut slot = 0;
            for pos in 0..SIZE {
                if bitmap & BIT_POS_16[pos] == 0 {
                    continue;
                }
                for dir in 0..4 {
                    let combo = group.link_format_combo[fmt_idx * 12 + slot * 4 + dir];
                    if combo == 0 {
                        continue;
                    }
                    let target = match dir {
                        0 => pos - 1,
                        1 => pos - 4,
                        2 => pos + 1,
                        _ => pos + 4,
                    };
                    let entry = group.link_move(fmt_idx as u32, target, dir);
                    assert_eq!(entry >> 8, group.format_index(combo >> 4));
                    assert_eq!((entry >> 4 & 0xF) as usize, slot);
                    assert_eq!(entry & 0xF, combo & 0xF);
                }
                slot += 1;
            }
        }
    }
}
