//! `Lsm`: the top-level engine. Owns the Write Buffer and the leveled list
//! of Sorted Runs; flushes on buffer overflow and cascades compaction
//! across levels (§4.6).
//!
//! Grounded on `original_source/src/lsm_tree.cpp` (`put`, `insertSST`,
//! `compactLevels`, `mergeSSTs` — the control flow this module mirrors) and
//! `prataprc-rdms/src/lsm.rs` (mined for naming only: the teacher's own
//! `lsm.rs` is a generic MVCC merge helper, not a controller, since that
//! machinery is out of scope here — see DESIGN.md).

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, info};

use crate::buffer::WriteBuffer;
use crate::cache::PageCache;
use crate::core::{require_non_negative_key, Key, Lookup, Strategy, Value, TOMBSTONE};
use crate::error::{Error, Result};
use crate::level::Level;
use crate::robt::{self, RunLookup, SortedRun};
use crate::robt_build::build_run;
use crate::robt_config::{btree_path, sst_path, timestamp_of, Config};

pub struct Lsm {
    dir: PathBuf,
    cfg: Config,
    buffer: WriteBuffer,
    levels: Vec<Level>,
    cache: PageCache,
    /// Runs a Membership Filter rejected outright during `get`, without any
    /// page I/O (§8 scenario 5). Does not count runs that were searched and
    /// simply missed.
    runs_skipped: u64,
    /// Held for the lifetime of this handle; guards the single-writer model
    /// (§5) against a second `Open` of the same directory from this process.
    /// Released automatically (`fs2` unlocks on `Drop`) when the `Lsm` is
    /// dropped or closed.
    _lock: File,
}

impl Lsm {
    /// §6 `Open("<db>")`: create or reopen. Any runs already present are
    /// loaded into level 0 (§9 Open Question 1 — baseline (a), not
    /// reconstructed level structure).
    pub fn open(dir: PathBuf, cfg: Config) -> Result<Lsm> {
        std::fs::create_dir_all(&dir)?;
        let lock_file = OpenOptions::new().write(true).create(true).open(dir.join("LOCK"))?;
        lock_file.try_lock_exclusive().map_err(|_| {
            Error::Domain(format!("database at {} is already open", dir.display()))
        })?;

        let mut levels = Vec::with_capacity(cfg.max_level + 1);
        for _ in 0..=cfg.max_level {
            levels.push(Level::new());
        }

        let mut timestamps: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            if let Some(ts) = timestamp_of(&path) {
                if !timestamps.contains(&ts) {
                    timestamps.push(ts);
                }
            }
        }
        timestamps.sort();

        for ts in timestamps {
            let sst_p = sst_path(&dir, &ts);
            let btree_p = btree_path(&dir, &ts);
            let bloom_p = crate::robt_config::bloom_path(&dir, &ts);
            if !sst_p.exists() || !btree_p.exists() || !bloom_p.exists() {
                continue; // an interrupted run; nothing recoverable (§7 I/O failure)
            }
            let run = SortedRun::open(ts, sst_p, btree_p, &bloom_p, cfg.bloom_hashes)?;
            levels[0].push(run);
        }

        Ok(Lsm {
            buffer: WriteBuffer::new(cfg.buffer_capacity),
            cache: PageCache::new(cfg.cache_pages),
            dir,
            cfg,
            levels,
            runs_skipped: 0,
            _lock: lock_file,
        })
    }

    pub fn runs_skipped(&self) -> u64 {
        self.runs_skipped
    }

    /// §4.6 write path.
    pub fn put(&mut self, key: Key, value: Value) -> Result<()> {
        let key = require_non_negative_key(key)?;
        self.buffer.put(key, value);
        if self.buffer.is_full() {
            self.flush()?;
        }
        Ok(())
    }

    /// §4.6 "`delete(k)` is `put(k, TOMBSTONE)`".
    pub fn delete(&mut self, key: Key) -> Result<()> {
        self.put(key, TOMBSTONE)
    }

    fn flush(&mut self) -> Result<()> {
        let entries = self.buffer.iter_sorted();
        self.buffer = WriteBuffer::new(self.cfg.buffer_capacity);
        if entries.is_empty() {
            return Ok(());
        }
        let built = build_run(&self.dir, &entries, &self.cfg)?;
        info!("flushed {} entries to run {}", built.entry_count, built.timestamp);
        let run = SortedRun::open(
            built.timestamp,
            built.sst_path,
            built.btree_path,
            &built.bloom_path,
            self.cfg.bloom_hashes,
        )?;
        self.ingest_run(run)
    }

    /// `ingest_run`: append to level 0, triggering compaction once level 0
    /// reaches the fan-out.
    fn ingest_run(&mut self, run: SortedRun) -> Result<()> {
        self.levels[0].push(run);
        if self.levels[0].runs.len() == self.cfg.fan_out {
            self.compact()?;
        }
        Ok(())
    }

    /// §4.6 Compaction: one forward pass over every level. A level exactly
    /// at the fan-out is merged and its result placed either on the same
    /// level or promoted — which, if it now also sits at the fan-out, is
    /// caught later in this same pass since levels are visited in order.
    fn compact(&mut self) -> Result<()> {
        for i in 0..=self.cfg.max_level {
            if self.levels[i].runs.len() != self.cfg.fan_out {
                continue;
            }
            let is_final = i == self.cfg.max_level;
            let runs = self.levels[i].drain_all();
            debug!("compacting level {i} ({} runs, final={is_final})", runs.len());

            let mut merged: Option<Vec<(Key, Value)>> = None;
            for run in &runs {
                let entries = run.full_scan(&mut self.cache)?;
                merged = Some(match merged {
                    None => entries,
                    Some(acc) => robt::merge_runs(&acc, &entries, is_final),
                });
            }
            let merged = merged.unwrap_or_default();

            for run in &runs {
                self.unlink_run(run)?;
            }

            if merged.is_empty() {
                continue; // every surviving key was tombstoned away at L_max
            }

            let built = build_run(&self.dir, &merged, &self.cfg)?;
            let new_run = SortedRun::open(
                built.timestamp,
                built.sst_path,
                built.btree_path,
                &built.bloom_path,
                self.cfg.bloom_hashes,
            )?;

            let size = new_run.byte_size();
            if size <= self.cfg.level_byte_budget(i) || i == self.cfg.max_level {
                self.levels[i].push(new_run);
            } else {
                self.levels[i + 1].push(new_run);
            }
        }
        Ok(())
    }

    fn unlink_run(&self, run: &SortedRun) -> Result<()> {
        let sst = sst_path(&self.dir, &run.timestamp);
        let btree = btree_path(&self.dir, &run.timestamp);
        let bloom = crate::robt_config::bloom_path(&self.dir, &run.timestamp);
        std::fs::remove_file(sst)?;
        std::fs::remove_file(btree)?;
        std::fs::remove_file(bloom)?;
        Ok(())
    }

    /// §4.6 read path.
    pub fn get(&mut self, key: Key, strategy: Strategy) -> Result<Lookup> {
        let key = require_non_negative_key(key)?;
        if let Some(value) = self.buffer.get(key) {
            return Ok(if value == TOMBSTONE { Lookup::Deleted } else { Lookup::Found(value) });
        }
        for level in &self.levels {
            for run in level.runs.iter().rev() {
                match run.get(key, strategy, &mut self.cache)? {
                    RunLookup::FilterRejected => {
                        self.runs_skipped += 1;
                    }
                    RunLookup::Searched(Lookup::Absent) => {}
                    RunLookup::Searched(found) => return Ok(found),
                }
            }
        }
        Ok(Lookup::Absent)
    }

    /// §4.6 range path: merge the buffer and every run, newest wins,
    /// tombstoned keys dropped from the final result.
    pub fn scan(&mut self, k1: Key, k2: Key, strategy: Strategy) -> Result<Vec<(Key, Value)>> {
        let mut merged: BTreeMap<Key, Value> = BTreeMap::new();
        for (k, v) in self.buffer.scan(k1, k2) {
            merged.entry(k).or_insert(v);
        }
        for level in &self.levels {
            for run in level.runs.iter().rev() {
                for (k, v) in run.scan(k1, k2, strategy, &mut self.cache)? {
                    merged.entry(k).or_insert(v);
                }
            }
        }
        Ok(merged.into_iter().filter(|&(_, v)| v != TOMBSTONE).collect())
    }

    /// §6 `Close()`: flush a non-empty buffer, then drop.
    pub fn close(mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.flush()?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(buffer_capacity: usize) -> Config {
        Config {
            buffer_capacity,
            fan_out: 2,
            max_level: 2,
            cache_pages: 16,
            ..Config::default()
        }
    }

    #[test]
    fn put_and_get_before_any_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut lsm = Lsm::open(dir.path().to_path_buf(), small_config(64)).unwrap();
        lsm.put(1, 10).unwrap();
        lsm.put(2, 20).unwrap();
        assert_eq!(lsm.get(1, Strategy::BTreeIndex).unwrap(), Lookup::Found(10));
        assert_eq!(lsm.get(99, Strategy::BTreeIndex).unwrap(), Lookup::Absent);
    }

    #[test]
    fn overwrite_wins_after_flush() {
        let dir = tempfile::tempdir().unwrap();
        let mut lsm = Lsm::open(dir.path().to_path_buf(), small_config(4)).unwrap();
        for k in 1..=4 {
            lsm.put(k, k * 10).unwrap();
        }
        // buffer just flushed; overwrite key 2 from the new buffer.
        lsm.put(2, 9999).unwrap();
        assert_eq!(lsm.get(2, Strategy::BTreeIndex).unwrap(), Lookup::Found(9999));
        assert_eq!(lsm.get(1, Strategy::PagedBinarySearch).unwrap(), Lookup::Found(10));
    }

    #[test]
    fn delete_reports_deleted_then_absent_after_elision() {
        let dir = tempfile::tempdir().unwrap();
        let mut lsm = Lsm::open(dir.path().to_path_buf(), small_config(2)).unwrap();
        lsm.put(1, 100).unwrap();
        lsm.put(2, 200).unwrap(); // flush #1 -> level 0 has 1 run
        lsm.delete(1).unwrap();
        lsm.put(3, 300).unwrap(); // flush #2 -> level 0 reaches fan_out, compacts
        assert_eq!(lsm.get(1, Strategy::BTreeIndex).unwrap(), Lookup::Deleted);
    }

    #[test]
    fn reopen_loads_existing_runs_into_level_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = small_config(2);
        {
            let mut lsm = Lsm::open(dir.path().to_path_buf(), cfg).unwrap();
            lsm.put(1, 10).unwrap();
            lsm.put(2, 20).unwrap();
            lsm.close().unwrap();
        }
        let mut reopened = Lsm::open(dir.path().to_path_buf(), cfg).unwrap();
        assert_eq!(reopened.get(1, Strategy::BTreeIndex).unwrap(), Lookup::Found(10));
        assert_eq!(reopened.levels[0].runs.len(), 1);
    }

    #[test]
    fn scan_merges_buffer_and_runs_and_drops_tombstones() {
        let dir = tempfile::tempdir().unwrap();
        let mut lsm = Lsm::open(dir.path().to_path_buf(), small_config(4)).unwrap();
        for k in 1..=4 {
            lsm.put(k, k * 10).unwrap();
        }
        lsm.delete(2).unwrap();
        let got = lsm.scan(1, 4, Strategy::BTreeIndex).unwrap();
        assert_eq!(got, vec![(1, 10), (3, 30), (4, 40)]);
    }
}
