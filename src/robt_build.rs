//! Sorted Run Materializer (§4.5): turns an ascending `(key, value)` stream
//! — always the Write Buffer's in-order entries, or a compaction merge's
//! output — into the three sibling files that make up one Sorted Run.
//!
//! Grounded on `prataprc-rdms/src/robt_build.rs`'s `Builder`/`Flusher` split
//! (stream in, flush pages out, finalize the index alongside) and
//! `original_source/src/sst.cpp`'s `writeMemtableToDisk` (page-at-a-time
//! direct I/O, bloom filter populated inline, tail page padded).

use std::path::Path;

use crate::aligned::AlignedPage;
use crate::bloom::MembershipFilter;
use crate::core::{Key, Value, ENTRIES_PER_PAGE, LEAF, PAGE_SIZE};
use crate::direct_io::PageFile;
use crate::error::{Error, Result};
use crate::page;
use crate::robt_config::{bloom_path, btree_path, new_timestamp, sst_path, Config};
use crate::robt_index::IndexBuilder;

/// Everything a reader needs to open the run this call just produced.
pub struct BuiltRun {
    pub timestamp: String,
    pub sst_path: std::path::PathBuf,
    pub btree_path: std::path::PathBuf,
    pub bloom_path: std::path::PathBuf,
    pub data_pages: u64,
    pub internal_pages: u64,
    pub entry_count: u64,
}

/// Materialize one Sorted Run from an already-ascending, already-deduped
/// stream of entries (callers — the Write Buffer flush path and the
/// compaction merge path — both guarantee ascending order; see §4.5, §4.6.1).
pub fn build_run(dir: &Path, entries: &[(Key, Value)], cfg: &Config) -> Result<BuiltRun> {
    if entries.is_empty() {
        return Err(Error::Domain("cannot materialize a run from zero entries".to_string()));
    }

    let ts = new_timestamp();
    let sst_p = sst_path(dir, &ts);
    let btree_p = btree_path(dir, &ts);
    let bloom_p = bloom_path(dir, &ts);

    let data_file = PageFile::create(&sst_p)?;
    let mut filter = MembershipFilter::new(cfg.bloom_bits, cfg.bloom_hashes);
    let mut index_builder = IndexBuilder::new();

    let mut offset = 0u64;
    let mut data_pages = 0u64;
    for (ordinal, chunk) in entries.chunks(ENTRIES_PER_PAGE).enumerate() {
        let pairs: Vec<(i64, i64)> = chunk.to_vec();
        let mut encoded: AlignedPage = page::encode_page(&pairs);
        if chunk.len() < ENTRIES_PER_PAGE {
            // only the final chunk can be short (§4.5 step 4).
            page::write_slot(&mut encoded, ENTRIES_PER_PAGE - 1, LEAF, LEAF);
        }
        data_file.write_page_at(offset, &encoded)?;
        offset += PAGE_SIZE as u64;
        data_pages += 1;

        let largest_key = chunk.last().expect("chunk is never empty").0;
        index_builder.add_data_page(largest_key, ordinal as u64);
        for (key, _value) in chunk {
            filter.put(*key);
        }
    }
    data_file.sync_all()?;

    let (index_pages, internal_pages) = index_builder.finalize();
    let btree_file = PageFile::create(&btree_p)?;
    let mut index_offset = 0u64;
    for raw in &index_pages {
        let mut encoded = AlignedPage::new()?;
        encoded.as_mut_slice().copy_from_slice(raw);
        btree_file.write_page_at(index_offset, &encoded)?;
        index_offset += PAGE_SIZE as u64;
    }
    btree_file.sync_all()?;

    std::fs::write(&bloom_p, filter.as_bytes())?;

    Ok(BuiltRun {
        timestamp: ts,
        sst_path: sst_p,
        btree_path: btree_p,
        bloom_path: bloom_p,
        data_pages,
        internal_pages,
        entry_count: entries.len() as u64,
    })
}
