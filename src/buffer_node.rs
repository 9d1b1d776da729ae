//! AVL node type for the Write Buffer, split out the way the teacher splits
//! `llrb_node.rs` from `llrb.rs`. Grounded on
//! `original_source/include/memtable.h`'s `Node{key,value,left,right,height}`
//! with manual rotations — this is that same node expressed as an owned
//! Rust tree instead of raw pointers.

use crate::core::{Key, Value};

pub struct Node {
    pub key: Key,
    pub value: Value,
    pub left: Option<Box<Node>>,
    pub right: Option<Box<Node>>,
    pub height: i32,
}

impl Node {
    pub fn leaf(key: Key, value: Value) -> Box<Node> {
        Box::new(Node {
            key,
            value,
            left: None,
            right: None,
            height: 1,
        })
    }
}

#[inline]
pub fn height(node: &Option<Box<Node>>) -> i32 {
    node.as_ref().map_or(0, |n| n.height)
}

#[inline]
pub fn balance_factor(node: &Node) -> i32 {
    height(&node.left) - height(&node.right)
}

fn recompute_height(node: &mut Node) {
    node.height = 1 + height(&node.left).max(height(&node.right));
}

fn rotate_right(mut root: Box<Node>) -> Box<Node> {
    let mut new_root = root.left.take().expect("rotate_right needs a left child");
    root.left = new_root.right.take();
    recompute_height(&mut root);
    new_root.right = Some(root);
    recompute_height(&mut new_root);
    new_root
}

fn rotate_left(mut root: Box<Node>) -> Box<Node> {
    let mut new_root = root.right.take().expect("rotate_left needs a right child");
    root.right = new_root.left.take();
    recompute_height(&mut root);
    new_root.left = Some(root);
    recompute_height(&mut new_root);
    new_root
}

/// Rebalance `node` after an insertion below it, returning the (possibly
/// new) subtree root.
pub fn rebalance(mut node: Box<Node>) -> Box<Node> {
    recompute_height(&mut node);
    let balance = balance_factor(&node);

    if balance > 1 {
        if balance_factor(node.left.as_ref().unwrap()) < 0 {
            node.left = Some(rotate_left(node.left.take().unwrap()));
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if balance_factor(node.right.as_ref().unwrap()) > 0 {
            node.right = Some(rotate_right(node.right.take().unwrap()));
        }
        return rotate_left(node);
    }
    node
}
