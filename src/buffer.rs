//! In-Memory Write Buffer (§4.4): a height-balanced ordered tree buffering
//! recent writes until it is full and must be flushed to a new Sorted Run.
//!
//! Grounded on `original_source/include/memtable.h` (AVL `Memtable`) and
//! split from its node type the way `prataprc-rdms/src/llrb.rs` is split
//! from `llrb_node.rs`.

use crate::buffer_node::{self, Node};
use crate::core::{Key, Value};

pub struct WriteBuffer {
    root: Option<Box<Node>>,
    capacity: usize,
    len: usize,
}

impl WriteBuffer {
    pub fn new(capacity: usize) -> WriteBuffer {
        WriteBuffer {
            root: None,
            capacity,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Insert or overwrite. Overwriting an existing key does not change
    /// `len` (§4.4: "no size change on overwrite").
    pub fn put(&mut self, key: Key, value: Value) {
        let mut inserted = false;
        self.root = Self::insert(self.root.take(), key, value, &mut inserted);
        if inserted {
            self.len += 1;
        }
    }

    fn insert(
        node: Option<Box<Node>>,
        key: Key,
        value: Value,
        inserted: &mut bool,
    ) -> Option<Box<Node>> {
        let mut node = match node {
            None => {
                *inserted = true;
                return Some(Node::leaf(key, value));
            }
            Some(node) => node,
        };

        match key.cmp(&node.key) {
            std::cmp::Ordering::Less => {
                node.left = Self::insert(node.left.take(), key, value, inserted);
            }
            std::cmp::Ordering::Greater => {
                node.right = Self::insert(node.right.take(), key, value, inserted);
            }
            std::cmp::Ordering::Equal => {
                node.value = value;
            }
        }
        Some(buffer_node::rebalance(node))
    }

    pub fn get(&self, key: Key) -> Option<Value> {
        let mut cursor = self.root.as_deref();
        while let Some(node) = cursor {
            match key.cmp(&node.key) {
                std::cmp::Ordering::Less => cursor = node.left.as_deref(),
                std::cmp::Ordering::Greater => cursor = node.right.as_deref(),
                std::cmp::Ordering::Equal => return Some(node.value),
            }
        }
        None
    }

    /// In-order entries with key in `[k1, k2]`, ascending.
    pub fn scan(&self, k1: Key, k2: Key) -> Vec<(Key, Value)> {
        let mut out = Vec::new();
        Self::scan_node(self.root.as_deref(), k1, k2, &mut out);
        out
    }

    fn scan_node(node: Option<&Node>, k1: Key, k2: Key, out: &mut Vec<(Key, Value)>) {
        let Some(node) = node else { return };
        if node.key > k1 {
            Self::scan_node(node.left.as_deref(), k1, k2, out);
        }
        if node.key >= k1 && node.key <= k2 {
            out.push((node.key, node.value));
        }
        if node.key < k2 {
            Self::scan_node(node.right.as_deref(), k1, k2, out);
        }
    }

    /// Every entry in ascending key order, used when flushing to a Sorted
    /// Run (§4.5 takes an ordered stream as input).
    pub fn iter_sorted(&self) -> Vec<(Key, Value)> {
        let mut out = Vec::with_capacity(self.len);
        Self::collect(self.root.as_deref(), &mut out);
        out
    }

    fn collect(node: Option<&Node>, out: &mut Vec<(Key, Value)>) {
        let Some(node) = node else { return };
        Self::collect(node.left.as_deref(), out);
        out.push((node.key, node.value));
        Self::collect(node.right.as_deref(), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TOMBSTONE;

    #[test]
    fn put_and_get() {
        let mut buf = WriteBuffer::new(16);
        for k in 0..10 {
            buf.put(k, k * 10);
        }
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.get(5), Some(50));
        assert_eq!(buf.get(99), None);
    }

    #[test]
    fn overwrite_does_not_grow() {
        let mut buf = WriteBuffer::new(16);
        buf.put(1, 100);
        buf.put(1, 200);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.get(1), Some(200));
    }

    #[test]
    fn tombstone_is_a_plain_value() {
        let mut buf = WriteBuffer::new(16);
        buf.put(1, 5);
        buf.put(1, TOMBSTONE);
        assert_eq!(buf.get(1), Some(TOMBSTONE));
    }

    #[test]
    fn scan_is_ascending_and_bounded() {
        let mut buf = WriteBuffer::new(64);
        for k in (0..20).rev() {
            buf.put(k, k);
        }
        let got = buf.scan(5, 10);
        assert_eq!(got, (5..=10).map(|k| (k, k)).collect::<Vec<_>>());
    }

    #[test]
    fn fills_to_capacity() {
        let mut buf = WriteBuffer::new(3);
        assert!(!buf.is_full());
        buf.put(1, 1);
        buf.put(2, 2);
        buf.put(3, 3);
        assert!(buf.is_full());
    }

    #[test]
    fn stays_balanced_under_sequential_insert() {
        let mut buf = WriteBuffer::new(2000);
        for k in 0..2000 {
            buf.put(k, k);
        }
        // AVL height is bounded by ~1.44 log2(n); sequential insertion into
        // an unbalanced tree would instead produce height n.
        fn height(node: &Option<Box<crate::buffer_node::Node>>) -> i32 {
            crate::buffer_node::height(node)
        }
        assert!(height(&buf.root) < 30);
    }
}
