//! Fixed-size constants and shared types for the engine.
//!
//! Keys and values are both signed 64-bit integers (§3). The page and entry
//! geometry is fixed at build time, not configurable at runtime, matching
//! the spec's "build-time constants unless stated" (§6).

use std::path::PathBuf;

use crate::error::Result;

/// A key in the store. Real keys must be non-negative; the domain boundary
/// (§7 "Domain error") rejects negative keys before they reach any
/// component below the LSM controller.
pub type Key = i64;

/// A value in the store. `TOMBSTONE` is reserved (§3).
pub type Value = i64;

/// Page size in bytes. All `sst_*`/`btree_*` files are multiples of this.
pub const PAGE_SIZE: usize = 4096;

/// Size in bytes of one (key, value) entry on disk.
pub const ENTRY_SIZE: usize = 16;

/// Entries per page: `PAGE_SIZE / ENTRY_SIZE`.
pub const ENTRIES_PER_PAGE: usize = PAGE_SIZE / ENTRY_SIZE;

/// Smallest representable `i64`; the tombstone sentinel (§3). Never a real
/// value written by a caller — `put(k, v)` with `v == TOMBSTONE` is
/// indistinguishable from `delete(k)` by construction (§4.6 "delete(k) is
/// put(k, TOMBSTONE)").
pub const TOMBSTONE: Value = Value::MIN;

/// Pad-byte sentinel. The on-disk pad pattern is the byte `0xFF` repeated,
/// which reads back as `-1` for any 8-byte slot (see `original_source`'s
/// `global.h: INTERNAL = -1`, reused both as the generic pad value and as
/// the Static B-Tree Index's internal/leaf-pointer-page discriminator).
pub const PAD: i64 = -1;

/// Marks the discriminator slot of a run's final data page when that page
/// is only partially filled (§3, §4.5 step 4).
pub const LEAF: i64 = -2;

/// True if `k` is a pad/sentinel slot rather than a real key. Per §4.2,
/// binary search must treat any negative slot as "no entry here" / past-end.
#[inline]
pub fn is_pad(k: i64) -> bool {
    k < 0
}

/// Identifies a page for the Page Cache: a file path plus a byte offset
/// (§3 "Cache entries are keyed by (file_path, byte_offset)").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId {
    pub path: PathBuf,
    pub offset: u64,
}

impl PageId {
    pub fn new(path: PathBuf, offset: u64) -> Self {
        PageId { path, offset }
    }
}

/// Result of a point lookup (§7: "Logical miss ... not an error; returned
/// as a typed absent result").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(Value),
    Deleted,
    Absent,
}

impl Lookup {
    pub fn is_present(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::Deleted | Lookup::Absent => None,
        }
    }
}

/// Which `get`/`scan` strategy to use against a Sorted Run (§4.7 vs §4.2).
/// A per-call tagged enum, as the design notes (§9) prescribe, rather than
/// a trait-object hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// §4.7: binary search directly over data pages.
    PagedBinarySearch,
    /// §4.2: descend the Static B-Tree Index.
    BTreeIndex,
}

/// Reject the parts of the domain the engine does not support (negative
/// keys). Returns the key back so call sites can use it fluently.
pub fn require_non_negative_key(key: Key) -> Result<Key> {
    if key < 0 {
        Err(crate::error::Error::Domain(format!(
            "negative keys are not supported: {key}"
        )))
    } else {
        Ok(key)
    }
}
