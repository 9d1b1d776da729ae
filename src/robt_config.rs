//! Build-time configuration and file-naming for Sorted Runs (§6): page and
//! entry geometry, bloom-filter defaults, and the timestamp-keyed path
//! scheme (`sst_<ts>.bin`, `btree_<ts>.bin`, `bloom_<ts>.bin`).
//!
//! Grounded on `prataprc-rdms/src/robt_config.rs`'s `Config` (a struct of
//! tunables plus path-builder methods) and
//! `original_source/src/sst.cpp`'s `getCurrentTimestamp`/filename assembly.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::bloom::{DEFAULT_BITS, DEFAULT_HASHES};
use crate::core::{ENTRIES_PER_PAGE, PAGE_SIZE};

/// Shared, process-wide tunables. All fields are build-time constants
/// per §6, surfaced here so tests can shrink them.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub page_size: usize,
    pub entries_per_page: usize,
    pub bloom_bits: usize,
    pub bloom_hashes: usize,
    /// Write Buffer capacity in entries (`N_buf`).
    pub buffer_capacity: usize,
    /// Per-level fan-out (`T`).
    pub fan_out: usize,
    /// Deepest level (`L_max`), inclusive.
    pub max_level: usize,
    /// Page Cache capacity in pages (`C`).
    pub cache_pages: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            page_size: PAGE_SIZE,
            entries_per_page: ENTRIES_PER_PAGE,
            bloom_bits: DEFAULT_BITS,
            bloom_hashes: DEFAULT_HASHES,
            buffer_capacity: 1024,
            fan_out: 2,
            max_level: 5,
            cache_pages: 10,
        }
    }
}

impl Config {
    /// `S_buf`, the Write Buffer capacity in bytes (§3).
    pub fn buffer_bytes(&self) -> u64 {
        self.buffer_capacity as u64 * crate::core::ENTRY_SIZE as u64
    }

    /// `T^(i+1) * S_buf`, the byte budget for level `i` (§3, §4.6).
    pub fn level_byte_budget(&self, level: usize) -> u64 {
        self.fan_out.pow(level as u32 + 1) as u64 * self.buffer_bytes()
    }
}

/// A freshly minted run timestamp: `YYYYMMDD_HHMMSS_mmm`, millisecond
/// resolution, lexically ordered by creation time (§6).
pub fn new_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

pub fn sst_path(dir: &Path, ts: &str) -> PathBuf {
    dir.join(format!("sst_{ts}.bin"))
}

pub fn btree_path(dir: &Path, ts: &str) -> PathBuf {
    dir.join(format!("btree_{ts}.bin"))
}

pub fn bloom_path(dir: &Path, ts: &str) -> PathBuf {
    dir.join(format!("bloom_{ts}.bin"))
}

/// Extract the `<ts>` component from any of the three sibling file names,
/// used when discovering existing runs on reopen (§6, §9 Open Question 1).
pub fn timestamp_of(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let ts = stem.strip_prefix("sst_")
        .or_else(|| stem.strip_prefix("btree_"))
        .or_else(|| stem.strip_prefix("bloom_"))?;
    Some(ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_grows_geometrically() {
        let cfg = Config {
            fan_out: 2,
            buffer_capacity: 10,
            ..Config::default()
        };
        let s_buf = cfg.buffer_bytes();
        assert_eq!(cfg.level_byte_budget(0), 2 * s_buf);
        assert_eq!(cfg.level_byte_budget(1), 4 * s_buf);
        assert_eq!(cfg.level_byte_budget(2), 8 * s_buf);
    }

    #[test]
    fn timestamp_extraction_roundtrips() {
        let ts = new_timestamp();
        let path = sst_path(Path::new("/tmp/db"), &ts);
        assert_eq!(timestamp_of(&path).unwrap(), ts);
    }
}
