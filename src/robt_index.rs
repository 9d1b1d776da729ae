//! Static B-Tree Index (§4.2): bottom-up streaming builder, finalize/renumber
//! pass, and the search routines used by both point `get` and range `scan`.
//!
//! Grounded on `prataprc-rdms/src/robt_index.rs`'s `MBlock`/`ZBlock` split
//! (encode vs. decode halves of one node type) and
//! `original_source/src/static_b_tree.cpp`'s `insertInternalNode`/
//! `finalizeTree` (streamed fan-out-capped node accumulation, upper layers
//! synthesized from full children's largest keys). Unlike the original, the
//! true largest key of each node (its trailing child's key) is carried
//! forward exactly rather than approximated from the last stored separator
//! — see DESIGN.md, Open Question 4 / discriminator notes.

use crate::core::{ENTRIES_PER_PAGE, PAD};
use crate::page;

/// One node accumulated while streaming `(largest_key, child)` pairs. Up to
/// `ENTRIES_PER_PAGE - 1` separators plus one trailing child.
struct FinishedNode {
    pairs: Vec<(i64, i64)>, // (separator_key, child_temp_id)
    trailing_child: i64,    // child_temp_id
    max_key: i64,           // == the key of (max_key, trailing_child) — propagates upward
}

/// Streams `(largest_key, child_id)` pairs into nodes of one layer.
/// `child_id` is always a temporary, layer-relative id: the 0-based
/// position within whatever sequence produced it (data-page ordinals for
/// layer 0, node positions within the layer below for every layer above).
struct LayerBuilder {
    nodes: Vec<FinishedNode>,
    pairs: Vec<(i64, i64)>,
    pending: Option<(i64, i64)>,
}

impl LayerBuilder {
    fn new() -> LayerBuilder {
        LayerBuilder {
            nodes: Vec::new(),
            pairs: Vec::new(),
            pending: None,
        }
    }

    fn push(&mut self, key: i64, child: i64) {
        if let Some((pk, pc)) = self.pending.take() {
            if self.pairs.len() < ENTRIES_PER_PAGE - 1 {
                self.pairs.push((pk, pc));
            } else {
                self.commit(pk, pc);
            }
        }
        self.pending = Some((key, child));
    }

    fn commit(&mut self, trailing_key: i64, trailing_child: i64) {
        let pairs = std::mem::take(&mut self.pairs);
        self.nodes.push(FinishedNode {
            pairs,
            trailing_child,
            max_key: trailing_key,
        });
    }

    fn finish(mut self) -> Vec<FinishedNode> {
        if let Some((pk, pc)) = self.pending.take() {
            self.commit(pk, pc);
        }
        self.nodes
    }
}

/// Driven by the Sorted Run Materializer: one `(largest_key, ordinal)` call
/// per completed data page, ordinal 0-based among data pages (§4.2 "build
/// time contract").
pub struct IndexBuilder {
    layer0: LayerBuilder,
}

impl IndexBuilder {
    pub fn new() -> IndexBuilder {
        IndexBuilder {
            layer0: LayerBuilder::new(),
        }
    }

    pub fn add_data_page(&mut self, largest_key: i64, data_page_ordinal: u64) {
        self.layer0.push(largest_key, data_page_ordinal as i64);
    }

    /// Finalize: build upper layers until exactly one node remains (the
    /// root), renumber everything so the root is page 0, internal/
    /// leaf-pointer pages occupy `[0, I)`, and data pages are addressed as
    /// `[I, I+D)`. Returns the serialized index pages (root first) and `I`.
    pub fn finalize(self) -> (Vec<Vec<u8>>, u64) {
        let mut layers: Vec<Vec<FinishedNode>> = vec![self.layer0.finish()];
        while layers.last().unwrap().len() > 1 {
            let mut up = LayerBuilder::new();
            for (pos, node) in layers.last().unwrap().iter().enumerate() {
                up.push(node.max_key, pos as i64);
            }
            layers.push(up.finish());
        }

        // `layers[0]` = layer0 (points at data pages) .. `layers.last()` = root layer (1 node).
        let internal_count: u64 = layers.iter().map(|l| l.len() as u64).sum();

        // Assign each layer a starting offset, root (topmost) first.
        let mut start_offsets = vec![0u64; layers.len()];
        let mut next = 0u64;
        for depth in (0..layers.len()).rev() {
            start_offsets[depth] = next;
            next += layers[depth].len() as u64;
        }
        debug_assert_eq!(next, internal_count);

        let mut pages: Vec<(u64, Vec<u8>)> = Vec::with_capacity(internal_count as usize);
        for depth in (0..layers.len()).rev() {
            let my_offset = start_offsets[depth];
            for (pos, node) in layers[depth].iter().enumerate() {
                let real_index = my_offset + pos as u64;
                let mut entries: Vec<(i64, i64)> = node
                    .pairs
                    .iter()
                    .map(|(key, child)| (*key, rewrite_child(depth, *child, &start_offsets, internal_count)))
                    .collect();
                // pad the gap between real separators and the discriminator slot
                while entries.len() < ENTRIES_PER_PAGE - 1 {
                    entries.push((PAD, PAD));
                }
                entries.push((
                    PAD,
                    rewrite_child(depth, node.trailing_child, &start_offsets, internal_count),
                ));
                let page = page::encode_page(&entries);
                pages.push((real_index, page.to_vec()));
            }
        }
        pages.sort_by_key(|(idx, _)| *idx);
        (pages.into_iter().map(|(_, bytes)| bytes).collect(), internal_count)
    }
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn rewrite_child(depth: usize, child_temp: i64, start_offsets: &[u64], internal_count: u64) -> i64 {
    if depth == 0 {
        internal_count as i64 + child_temp
    } else {
        start_offsets[depth - 1] as i64 + child_temp
    }
}

/// Outcome of descending one index page toward a key.
pub enum Step {
    /// Follow this child index next (may be another index page, or — once
    /// `child >= data_pages_start` — a data page).
    Child(u64),
}

/// Given a decoded index page and a target key, find the child to descend
/// into (§4.2 point 2: smallest separator `>= key`, else the trailing
/// child).
pub fn descend(page_bytes: &[u8], key: i64) -> Step {
    let count = page::real_entry_count(page_bytes);
    let mut lo = 0usize;
    let mut hi = count; // search in [0, count)
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let sep = page::slot_key(page_bytes, mid);
        if sep >= key {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    if lo < count {
        Step::Child(page::slot_value(page_bytes, lo) as u64)
    } else {
        // key exceeds every separator: trailing child, always at the last slot.
        Step::Child(page::slot_value(page_bytes, ENTRIES_PER_PAGE - 1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_node_is_its_own_root() {
        let mut builder = IndexBuilder::new();
        for ord in 0..4u64 {
            builder.add_data_page(ord as i64 * 10, ord);
        }
        let (pages, internal_count) = builder.finalize();
        assert_eq!(internal_count, 1);
        assert_eq!(pages.len(), 1);
        assert!(page::is_index_page(&pages[0]));
    }

    #[test]
    fn separator_matches_page_max_key() {
        // 4 data pages whose max keys are 9, 19, 29, 39; all fit in one node,
        // so that node is the root and addresses data pages directly (internal_count == 1).
        let mut builder = IndexBuilder::new();
        for ord in 0..4u64 {
            builder.add_data_page(ord as i64 * 10 + 9, ord);
        }
        let (pages, internal_count) = builder.finalize();
        assert_eq!(internal_count, 1);
        let root = &pages[0];
        // first 3 children get real separators (the 4th, trailing, is implicit).
        for i in 0..3 {
            assert_eq!(page::slot_key(root, i), i as i64 * 10 + 9);
            assert_eq!(page::slot_value(root, i), internal_count as i64 + i as i64);
        }
        // trailing child (data page 3) lives at the discriminator slot.
        assert_eq!(page::slot_value(root, ENTRIES_PER_PAGE - 1), internal_count as i64 + 3);
    }

    #[test]
    fn builds_two_layers_when_data_pages_exceed_fanout() {
        let n = ENTRIES_PER_PAGE as u64 * 3 + 5;
        let mut builder = IndexBuilder::new();
        for ord in 0..n {
            builder.add_data_page(ord as i64, ord);
        }
        let (pages, internal_count) = builder.finalize();
        // layer0 has ceil(n/256) = 4 nodes, so a root layer above it is required.
        assert!(internal_count > 1);
        assert!(page::is_index_page(&pages[0]));
        // root's children must all resolve to other index pages, not data pages.
        let descended = match descend(&pages[0], 0) {
            Step::Child(c) => c,
        };
        assert!(descended < internal_count);
    }

    #[test]
    fn descend_finds_smallest_separator_ge_key() {
        let mut builder = IndexBuilder::new();
        for ord in 0..4u64 {
            builder.add_data_page(ord as i64 * 10 + 9, ord);
        }
        let (pages, internal_count) = builder.finalize();
        let root = &pages[0];
        // key 5 should route to child covering [0,9] => data page 0
        match descend(root, 5) {
            Step::Child(c) => assert_eq!(c, internal_count),
        }
        // key 25 routes to the page covering [20,29] => data page 2
        match descend(root, 25) {
            Step::Child(c) => assert_eq!(c, internal_count + 2),
        }
        // key beyond all separators routes to the trailing (last) child
        match descend(root, 1000) {
            Step::Child(c) => assert_eq!(c, internal_count + 3),
        }
    }
}
