//! Shared page encode/decode helpers for both the Sorted Run data file and
//! the Static B-Tree Index file — both use the identical
//! `ENTRIES_PER_PAGE`-slots-of-`(i64, i64)` layout (§3, §4.2).

use crate::aligned::AlignedPage;
use crate::core::{ENTRIES_PER_PAGE, ENTRY_SIZE, PAD};

/// Encode up to `ENTRIES_PER_PAGE` `(key, value-or-child)` pairs into a
/// freshly padded page. Panics if `entries.len() > ENTRIES_PER_PAGE` — every
/// caller in this crate enforces that invariant before calling.
pub fn encode_page(entries: &[(i64, i64)]) -> AlignedPage {
    assert!(entries.len() <= ENTRIES_PER_PAGE);
    let mut page = AlignedPage::new().expect("aligned page allocation");
    page.fill_pad();
    for (i, (k, v)) in entries.iter().enumerate() {
        write_slot(&mut page, i, *k, *v);
    }
    page
}

pub fn write_slot(page: &mut AlignedPage, index: usize, key: i64, value: i64) {
    let off = index * ENTRY_SIZE;
    page[off..off + 8].copy_from_slice(&key.to_le_bytes());
    page[off + 8..off + 16].copy_from_slice(&value.to_le_bytes());
}

pub fn slot_key(page: &[u8], index: usize) -> i64 {
    let off = index * ENTRY_SIZE;
    i64::from_le_bytes(page[off..off + 8].try_into().unwrap())
}

pub fn slot_value(page: &[u8], index: usize) -> i64 {
    let off = index * ENTRY_SIZE;
    i64::from_le_bytes(page[off + 8..off + 16].try_into().unwrap())
}

/// The discriminator slot is always the page's last slot (§4.2). A page is
/// an internal/leaf-pointer index page iff that slot's key is `PAD`.
pub fn is_index_page(page: &[u8]) -> bool {
    slot_key(page, ENTRIES_PER_PAGE - 1) == PAD
}

/// Number of real (non-pad, non-leaf-marker) entries at the front of a data
/// page. Every data page other than the final one is always completely
/// full by construction (§4.5 only ever flushes a partial buffer at
/// end-of-stream), so this only needs to scan for the first sentinel.
pub fn real_entry_count(page: &[u8]) -> usize {
    for i in 0..ENTRIES_PER_PAGE {
        let k = slot_key(page, i);
        if k < 0 {
            return i;
        }
    }
    ENTRIES_PER_PAGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_page_has_no_pad() {
        let entries: Vec<(i64, i64)> = (0..ENTRIES_PER_PAGE as i64).map(|k| (k, k * 10)).collect();
        let page = encode_page(&entries);
        assert!(!is_index_page(&page));
        assert_eq!(real_entry_count(&page), ENTRIES_PER_PAGE);
        assert_eq!(slot_key(&page, 0), 0);
        assert_eq!(slot_value(&page, ENTRIES_PER_PAGE - 1), (ENTRIES_PER_PAGE as i64 - 1) * 10);
    }

    #[test]
    fn partial_page_pads_tail() {
        let entries = vec![(1i64, 10i64), (2, 20)];
        let page = encode_page(&entries);
        assert_eq!(real_entry_count(&page), 2);
        assert_eq!(slot_key(&page, 2), PAD);
    }
}
