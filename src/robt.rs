//! `SortedRun`: an immutable, already-materialized `(sst, btree, bloom)`
//! triple opened for reading — point `get` and range `scan` under either
//! search strategy (§4.2, §4.7), plus the pairwise-merge helper compaction
//! drives (§4.6.1).
//!
//! Grounded on `prataprc-rdms/src/robt.rs` (the top-level type tying
//! together an index, a data file, and a bloom filter behind one API) and
//! `original_source/src/static_b_tree.cpp` +
//! `original_source/experiments/binary_search_vs_btree.cpp`, which run both
//! search strategies side by side — confirming they are two interchangeable
//! entry points onto the same on-disk layout, not two different formats.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::bloom::MembershipFilter;
use crate::cache::PageCache;
use crate::core::{Key, Lookup, PageId, Strategy, Value, PAGE_SIZE, TOMBSTONE};
use crate::direct_io::PageFile;
use crate::error::{Error, Result};
use crate::page;
use crate::robt_index::{self, Step};

/// Outcome of a run-level point lookup, distinguishing a Membership Filter
/// rejection (no page I/O performed) from a search that actually ran and
/// missed (§8 scenario 5 counts only the former as "skipped").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLookup {
    FilterRejected,
    Searched(Lookup),
}

pub struct SortedRun {
    pub timestamp: String,
    sst_path: PathBuf,
    btree_path: PathBuf,
    sst: PageFile,
    btree: PageFile,
    filter: MembershipFilter,
    data_pages: u64,
    internal_pages: u64,
}

impl SortedRun {
    pub fn open(
        timestamp: String,
        sst_path: PathBuf,
        btree_path: PathBuf,
        bloom_path: &Path,
        bloom_hashes: usize,
    ) -> Result<SortedRun> {
        let sst = PageFile::open_read(&sst_path)?;
        let btree = PageFile::open_read(&btree_path)?;
        let bloom_bytes = std::fs::read(bloom_path)?;
        let filter = MembershipFilter::from_bytes(bloom_bytes, bloom_hashes);
        let data_pages = sst.page_count()?;
        let internal_pages = btree.page_count()?;
        Ok(SortedRun {
            timestamp,
            sst_path,
            btree_path,
            sst,
            btree,
            filter,
            data_pages,
            internal_pages,
        })
    }

    pub fn byte_size(&self) -> u64 {
        self.data_pages * PAGE_SIZE as u64 + self.internal_pages * PAGE_SIZE as u64
    }

    fn read_data_page(&self, ordinal: u64, cache: &mut PageCache) -> Result<Rc<[u8]>> {
        let id = PageId::new(self.sst_path.clone(), ordinal * PAGE_SIZE as u64);
        if let Some(bytes) = cache.lookup(&id) {
            return Ok(bytes);
        }
        let page = self.sst.read_page_at(id.offset)?;
        let bytes: Rc<[u8]> = Rc::from(page.as_slice());
        cache.insert(id, Rc::clone(&bytes));
        Ok(bytes)
    }

    fn read_index_page(&self, ordinal: u64, cache: &mut PageCache) -> Result<Rc<[u8]>> {
        let id = PageId::new(self.btree_path.clone(), ordinal * PAGE_SIZE as u64);
        if let Some(bytes) = cache.lookup(&id) {
            return Ok(bytes);
        }
        let page = self.btree.read_page_at(id.offset)?;
        let bytes: Rc<[u8]> = Rc::from(page.as_slice());
        cache.insert(id, Rc::clone(&bytes));
        Ok(bytes)
    }

    /// §4.2: descend the Static B-Tree Index from the root to the data page
    /// that would hold `key`.
    fn descend_to_data_ordinal(&self, key: Key, cache: &mut PageCache) -> Result<u64> {
        let mut offset_ordinal = 0u64;
        loop {
            let page = self.read_index_page(offset_ordinal, cache)?;
            if !page::is_index_page(&page) {
                return Err(Error::Corrupt(
                    "btree file contained a non-index page before the data boundary".to_string(),
                ));
            }
            let Step::Child(child) = robt_index::descend(&page, key);
            if child >= self.internal_pages {
                return Ok(child - self.internal_pages);
            }
            offset_ordinal = child;
        }
    }

    /// §4.7: binary search directly over the data pages, bypassing the
    /// index entirely. Returns the first page whose largest key is `>=
    /// key`, or `data_pages` if every page's keys fall short.
    fn binary_search_start_ordinal(&self, key: Key, cache: &mut PageCache) -> Result<u64> {
        let (mut lo, mut hi) = (0u64, self.data_pages);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let page = self.read_data_page(mid, cache)?;
            let count = page::real_entry_count(&page);
            let last_key = if count == 0 { Key::MIN } else { page::slot_key(&page, count - 1) };
            if last_key >= key {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        Ok(lo)
    }

    fn lookup_in_page(page: &[u8], key: Key) -> Lookup {
        let count = page::real_entry_count(page);
        let (mut lo, mut hi) = (0usize, count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let probe = page::slot_key(page, mid);
            if probe < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < count && page::slot_key(page, lo) == key {
            let value = page::slot_value(page, lo);
            if value == TOMBSTONE {
                Lookup::Deleted
            } else {
                Lookup::Found(value)
            }
        } else {
            Lookup::Absent
        }
    }

    /// Point lookup (§4.2 / §4.7, selected by `strategy`). The Membership
    /// Filter is always consulted first regardless of strategy (§4.3: "a
    /// run-level short-circuit ahead of either search path"), and the
    /// result says whether that filter is what ended the search.
    pub fn get(&self, key: Key, strategy: Strategy, cache: &mut PageCache) -> Result<RunLookup> {
        if !self.filter.might_contain(key) {
            return Ok(RunLookup::FilterRejected);
        }
        let ordinal = match strategy {
            Strategy::BTreeIndex => self.descend_to_data_ordinal(key, cache)?,
            Strategy::PagedBinarySearch => self.binary_search_start_ordinal(key, cache)?,
        };
        if ordinal >= self.data_pages {
            return Ok(RunLookup::Searched(Lookup::Absent));
        }
        let page = self.read_data_page(ordinal, cache)?;
        Ok(RunLookup::Searched(Self::lookup_in_page(&page, key)))
    }

    /// Ascending range scan over `[k1, k2]` (§4.2 / §4.7): locate the
    /// starting data page once, then walk forward sequentially — runs never
    /// need the index past the first page, since data pages are laid out
    /// contiguously and in order.
    pub fn scan(&self, k1: Key, k2: Key, strategy: Strategy, cache: &mut PageCache) -> Result<Vec<(Key, Value)>> {
        if self.data_pages == 0 {
            return Ok(Vec::new());
        }
        let mut ordinal = match strategy {
            Strategy::BTreeIndex => self.descend_to_data_ordinal(k1, cache)?,
            Strategy::PagedBinarySearch => self.binary_search_start_ordinal(k1, cache)?,
        };
        let mut out = Vec::new();
        while ordinal < self.data_pages {
            let page = self.read_data_page(ordinal, cache)?;
            let count = page::real_entry_count(&page);
            let mut past_end = false;
            for i in 0..count {
                let k = page::slot_key(&page, i);
                if k > k2 {
                    past_end = true;
                    break;
                }
                if k >= k1 {
                    out.push((k, page::slot_value(&page, i)));
                }
            }
            if past_end {
                break;
            }
            ordinal += 1;
        }
        Ok(out)
    }

    /// Every entry in the run, ascending. Used by compaction, which always
    /// merges whole runs (§4.6.1).
    pub fn full_scan(&self, cache: &mut PageCache) -> Result<Vec<(Key, Value)>> {
        let mut out = Vec::new();
        for ordinal in 0..self.data_pages {
            let page = self.read_data_page(ordinal, cache)?;
            let count = page::real_entry_count(&page);
            for i in 0..count {
                out.push((page::slot_key(&page, i), page::slot_value(&page, i)));
            }
        }
        Ok(out)
    }
}

/// Pairwise merge of two ascending entry streams (§4.6.1). `newer` wins
/// ties, matching "the run that sorts later in compaction order overwrites
/// the older one on an equal key". When `elide_tombstones` is set (only
/// true when merging into the deepest level, §4.6 "tombstones are dropped
/// only once they reach `L_max`"), entries resolving to `TOMBSTONE` are
/// dropped instead of carried forward.
pub fn merge_runs(older: &[(Key, Value)], newer: &[(Key, Value)], elide_tombstones: bool) -> Vec<(Key, Value)> {
    let mut out = Vec::with_capacity(older.len() + newer.len());
    let (mut i, mut j) = (0usize, 0usize);
    let push = |out: &mut Vec<(Key, Value)>, entry: (Key, Value)| {
        if elide_tombstones && entry.1 == TOMBSTONE {
            return;
        }
        out.push(entry);
    };
    while i < older.len() && j < newer.len() {
        match older[i].0.cmp(&newer[j].0) {
            std::cmp::Ordering::Less => {
                push(&mut out, older[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                push(&mut out, newer[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                push(&mut out, newer[j]);
                i += 1;
                j += 1;
            }
        }
    }
    while i < older.len() {
        push(&mut out, older[i]);
        i += 1;
    }
    while j < newer.len() {
        push(&mut out, newer[j]);
        j += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robt_build::build_run;
    use crate::robt_config::Config;

    fn open(dir: &Path, built: &crate::robt_build::BuiltRun, cfg: &Config) -> SortedRun {
        SortedRun::open(
            built.timestamp.clone(),
            built.sst_path.clone(),
            built.btree_path.clone(),
            &built.bloom_path,
            cfg.bloom_hashes,
        )
        .unwrap()
    }

    #[test]
    fn point_lookup_agrees_across_strategies() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::default();
        let n = ENTRIES_PER_PAGE_TEST * 3 + 11;
        let entries: Vec<(Key, Value)> = (0..n).map(|k| (k as i64, k as i64 * 2)).collect();
        let built = build_run(dir.path(), &entries, &cfg).unwrap();
        let run = open(dir.path(), &built, &cfg);
        let mut cache = PageCache::new(64);
        for &(k, v) in entries.iter().step_by(37) {
            assert_eq!(run.get(k, Strategy::BTreeIndex, &mut cache).unwrap(), RunLookup::Searched(Lookup::Found(v)));
            assert_eq!(
                run.get(k, Strategy::PagedBinarySearch, &mut cache).unwrap(),
                RunLookup::Searched(Lookup::Found(v))
            );
        }
        // -1 was never inserted; the filter may or may not reject it, but
        // either way it must not resolve to a found/deleted entry.
        match run.get(-1, Strategy::BTreeIndex, &mut cache).unwrap() {
            RunLookup::FilterRejected | RunLookup::Searched(Lookup::Absent) => {}
            other => panic!("expected -1 to be absent, got {other:?}"),
        }
    }

    #[test]
    fn scan_is_ascending_and_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::default();
        let entries: Vec<(Key, Value)> = (0..500).map(|k| (k, k)).collect();
        let built = build_run(dir.path(), &entries, &cfg).unwrap();
        let run = open(dir.path(), &built, &cfg);
        let mut cache = PageCache::new(64);
        let got = run.scan(100, 110, Strategy::BTreeIndex, &mut cache).unwrap();
        assert_eq!(got, (100..=110).map(|k| (k, k)).collect::<Vec<_>>());
        let got2 = run.scan(100, 110, Strategy::PagedBinarySearch, &mut cache).unwrap();
        assert_eq!(got2, got);
    }

    #[test]
    fn merge_breaks_ties_toward_newer() {
        let older = vec![(1, 10), (2, 20), (3, 30)];
        let newer = vec![(2, 200), (4, 40)];
        let merged = merge_runs(&older, &newer, false);
        assert_eq!(merged, vec![(1, 10), (2, 200), (3, 30), (4, 40)]);
    }

    #[test]
    fn merge_elides_tombstones_only_when_requested() {
        let older = vec![(1, 10)];
        let newer = vec![(1, TOMBSTONE)];
        assert_eq!(merge_runs(&older, &newer, false), vec![(1, TOMBSTONE)]);
        assert_eq!(merge_runs(&older, &newer, true), Vec::<(Key, Value)>::new());
    }

    const ENTRIES_PER_PAGE_TEST: i32 = crate::core::ENTRIES_PER_PAGE as i32;
}
