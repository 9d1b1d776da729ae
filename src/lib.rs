//! `lsmkv`: an embedded, single-writer LSM-tree key-value store keyed by
//! 64-bit integers.
//!
//! See `DESIGN.md` for the grounding ledger and `SPEC_FULL.md` for the full
//! requirements this crate implements.

pub mod aligned;
pub mod bloom;
pub mod buffer;
pub mod buffer_node;
pub mod cache;
pub mod cli;
pub mod core;
pub mod direct_io;
pub mod error;
pub mod hash;
pub mod level;
pub mod lsm;
pub mod page;
pub mod robt;
pub mod robt_build;
pub mod robt_config;
pub mod robt_index;

pub use core::{Key, Lookup, Strategy, Value, TOMBSTONE};
pub use error::{Error, Result};
pub use lsm::Lsm;
