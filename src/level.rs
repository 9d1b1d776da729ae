//! `Level`: one tier of the LSM tree — an ordered list of Sorted Runs (§3,
//! §4.6). The byte-budget check that decides whether a freshly compacted
//! run stays or cascades down lives in `lsm.rs`, since it's a property of
//! the candidate run, not of the level's current contents.
//!
//! Grounded on `original_source/include/lsm_tree.h`'s
//! `std::vector<std::vector<SST>> levels` (one vector of SSTs per level,
//! oldest first).

use crate::robt::SortedRun;

/// One level of the tree. Runs are kept oldest-first; within a level, a
/// later run's keys take priority over an earlier run's on overlap (§4.6.1
/// "newer wins").
pub struct Level {
    pub runs: Vec<SortedRun>,
}

impl Level {
    pub fn new() -> Level {
        Level { runs: Vec::new() }
    }

    pub fn push(&mut self, run: SortedRun) {
        self.runs.push(run);
    }

    /// Take every run out of this level, emptying it. Used when cascading:
    /// all runs at a level are merged together and the result moves down.
    pub fn drain_all(&mut self) -> Vec<SortedRun> {
        std::mem::take(&mut self.runs)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_level_is_empty() {
        let level = Level::new();
        assert!(level.runs.is_empty());
    }

    #[test]
    fn drain_all_empties_the_level_and_returns_its_runs() {
        let mut level = Level::new();
        assert!(level.drain_all().is_empty());
    }
}
