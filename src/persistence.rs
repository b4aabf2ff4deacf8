//! File I/O for the precomputed pattern tables.
//!
//! Element file `database/pattern_element_<g>.db` (big-endian u32s,
//! concatenated in this order):
//! - `keys2combo`: g! entries
//! - `rotate_key_by_pos`: g! * g * MAX_SHIFT_X2[g] entries
//! - `formats2combo`: C(16, g) entries
//! - `link_format_move`: C(16, g) * 64 entries
//! - `link_format_combo`: C(16, g) * g * 4 entries
//!
//! Pattern value file `database/pattern_db_<name>.db`: the raw u8 value
//! table of each group in partition order, each sized
//! C(16, g) * g! entries.
//!
//! Any read error or truncation makes the caller regenerate everything;
//! a failed save deletes all partially written files so the next run
//! starts from a clean slate.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::elements::{
    Elements, GroupElements, FORMAT_COUNT, KEY_COUNT, MAX_SHIFT_X2, STANDARD_GROUPS,
};

/// Directory holding all generated tables, relative to the working
/// directory; created on demand.
pub const DATABASE_DIR: &str = "database";

fn element_path(dir: &Path, size: usize) -> PathBuf {
    dir.join(format!("pattern_element_{}.db", size))
}

fn pattern_db_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("pattern_db_{}.db", name))
}

/// Loads element tables for the given group sizes, regenerating and
/// re-saving every standard group when any file is missing or corrupt.
pub fn load_or_generate_elements(dir: &Path, sizes: &[usize]) -> Elements {
    match load_elements(dir, sizes) {
        Ok(elements) => elements,
        Err(err) => {
            warn!("element tables unreadable ({}), regenerating", err);
            let elements = Elements::generate();
            if let Err(err) = save_elements(dir, &elements, &STANDARD_GROUPS) {
                warn!("element tables could not be saved: {}", err);
            } else {
                info!("element tables regenerated and saved to {:?}", dir);
            }
            elements
        }
    }
}

/// Reads element tables for the given group sizes; fails on the first
/// missing or truncated file.
pub fn load_elements(dir: &Path, sizes: &[usize]) -> io::Result<Elements> {
    let mut groups = Vec::with_capacity(sizes.len());
    for &size in sizes {
        groups.push(load_group(dir, size)?);
    }
    Ok(Elements::from_groups(groups))
}

fn load_group(dir: &Path, size: usize) -> io::Result<GroupElements> {
    let file = File::open(element_path(dir, size))?;
    let mut reader = BufReader::new(file);

    let keys2combo = read_u32s(&mut reader, KEY_COUNT[size])?;
    let rotate_key_by_pos =
        read_u32s(&mut reader, KEY_COUNT[size] * size * MAX_SHIFT_X2[size])?;
    let formats2combo = read_u32s(&mut reader, FORMAT_COUNT[size])?;
    let link_format_move = read_u32s(&mut reader, FORMAT_COUNT[size] * 64)?;
    let link_format_combo = read_u32s(&mut reader, FORMAT_COUNT[size] * size * 4)?;

    Ok(GroupElements::from_tables(
        size,
        keys2combo,
        rotate_key_by_pos,
        formats2combo,
        link_format_move,
        link_format_combo,
    ))
}

/// Writes element tables for the given group sizes, deleting every file of
/// the set if any single write fails.
pub fn save_elements(dir: &Path, elements: &Elements, sizes: &[usize]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let result = sizes
        .iter()
        .try_for_each(|&size| save_group(dir, elements, size));
    if result.is_err() {
        for &size in sizes {
            let _ = fs::remove_file(element_path(dir, size));
        }
    }
    result
}

fn save_group(dir: &Path, elements: &Elements, size: usize) -> io::Result<()> {
    let group = elements.group(size);
    let path = element_path(dir, size);
    if path.exists() {
        fs::remove_file(&path)?;
    }

    let mut writer = BufWriter::new(File::create(&path)?);
    write_u32s(&mut writer, &group.keys2combo)?;
    write_u32s(&mut writer, &group.rotate_key_by_pos)?;
    write_u32s(&mut writer, &group.formats2combo)?;
    write_u32s(&mut writer, &group.link_format_move)?;
    write_u32s(&mut writer, &group.link_format_combo)?;
    writer.flush()
}

/// Reads a pattern-database value file; `group_lens` lists the expected
/// table length of each group in partition order.
pub fn load_pattern_db(dir: &Path, name: &str, group_lens: &[usize]) -> io::Result<Vec<Vec<u8>>> {
    let file = File::open(pattern_db_path(dir, name))?;
    let mut reader = BufReader::new(file);

    let mut tables = Vec::with_capacity(group_lens.len());
    for &len in group_lens {
        let mut values = vec![0u8; len];
        reader.read_exact(&mut values)?;
        tables.push(values);
    }
    Ok(tables)
}

/// Writes a pattern-database value file, deleting it again if the write
/// fails partway.
pub fn save_pattern_db(dir: &Path, name: &str, tables: &[Vec<u8>]) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = pattern_db_path(dir, name);
    let result = (|| -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&path)?);
        for values in tables {
            writer.write_all(values)?;
        }
        writer.flush()
    })();
    if result.is_err() {
        let _ = fs::remove_file(&path);
    }
    result
}

fn read_u32s<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<u32>> {
    let mut bytes = vec![0u8; count * 4];
    reader.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn write_u32s<W: Write>(writer: &mut W, values: &[u32]) -> io::Result<()> {
    for &value in values {
        writer.write_all(&value.to_be_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fifteen-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_element_save_load_round_trip() {
        let dir = scratch_dir("elements");
        let generated = Elements::generate_up_to(3);
        save_elements(&dir, &generated, &[2, 3]).unwrap();

        let loaded = load_elements(&dir, &[2, 3]).unwrap();
        for size in 2..=3 {
            assert_eq!(
                loaded.group(size).keys2combo,
                generated.group(size).keys2combo
            );
            assert_eq!(
                loaded.group(size).rotate_key_by_pos,
                generated.group(size).rotate_key_by_pos
            );
            assert_eq!(
                loaded.group(size).formats2combo,
                generated.group(size).formats2combo
            );
            assert_eq!(
                loaded.group(size).link_format_move,
                generated.group(size).link_format_move
            );
            assert_eq!(
                loaded.group(size).link_format_combo,
                generated.group(size).link_format_combo
            );
        }

        // saving what was loaded reproduces identical files
        let copy = scratch_dir("elements-copy");
        save_elements(&copy, &loaded, &[3]).unwrap();
        assert_eq!(
            fs::read(element_path(&dir, 3)).unwrap(),
            fs::read(element_path(&copy, 3)).unwrap()
        );
        let _ = fs::remove_dir_all(&dir);
        let _ = fs::remove_dir_all(&copy);
    }

    #[test]
    fn test_truncated_element_file_is_rejected() {
        let dir = scratch_dir("truncated");
        let generated = Elements::generate_up_to(3);
        save_elements(&dir, &generated, &[3]).unwrap();

        let path = element_path(&dir, 3);
        let len = fs::metadata(&path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len / 2)
            .unwrap();
        assert!(load_elements(&dir, &[3]).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_rejected() {
        let dir = scratch_dir("missing");
        assert!(load_elements(&dir, &[3]).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_pattern_db_round_trip_and_length_check() {
        let dir = scratch_dir("pdb");
        let tables = vec![vec![1u8, 2, 3], vec![4u8, 5]];
        save_pattern_db(&dir, "test", &tables).unwrap();
        assert_eq!(load_pattern_db(&dir, "test", &[3, 2]).unwrap(), tables);
        assert!(load_pattern_db(&dir, "test", &[3, 9]).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
