//! Sparse index from log index to frame offset.

use std::collections::BTreeMap;

/// A sampled index entry: frame `index` starts at byte `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Log index of the frame.
    pub index: u64,
    /// Byte offset of the frame header.
    pub position: u64,
}

/// Offsets of every `step`-th entry of a segment.
///
/// The step is `ceil(1 / density)`, so a density of 0.2 records every fifth
/// index. Readers seek to the nearest recorded offset at or below their
/// target and scan forward from there.
#[derive(Debug, Clone)]
pub struct SparseIndex {
    step: u64,
    positions: BTreeMap<u64, u64>,
}

impl SparseIndex {
    /// Creates an index sampling the given fraction of entries.
    ///
    /// `density` is expected in (0, 1); the configuration validates it.
    #[must_use]
    pub fn new(density: f64) -> Self {
        let step = (1.0 / density).ceil();
        let step = if step.is_finite() && step >= 1.0 {
            step as u64
        } else {
            1
        };
        Self::with_step(step)
    }

    /// Creates an index recording every `step`-th entry.
    #[must_use]
    pub fn with_step(step: u64) -> Self {
        Self {
            step: step.max(1),
            positions: BTreeMap::new(),
        }
    }

    /// Returns the sampling step.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Offers a frame to the index. Returns true if it was recorded.
    pub fn index(&mut self, index: u64, position: u64) -> bool {
        if index % self.step != 0 {
            return false;
        }
        self.positions.insert(index, position);
        true
    }

    /// Returns the recorded entry with the greatest index not above `index`.
    #[must_use]
    pub fn lookup(&self, index: u64) -> Option<Position> {
        self.positions
            .range(..=index)
            .next_back()
            .map(|(&index, &position)| Position { index, position })
    }

    /// Forgets every entry above `index`.
    pub fn truncate(&mut self, index: u64) {
        if let Some(above) = index.checked_add(1) {
            self.positions.split_off(&above);
        }
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.positions.clear();
    }

    /// Returns the number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_from_density() {
        assert_eq!(SparseIndex::new(0.2).step(), 5);
        assert_eq!(SparseIndex::new(0.005).step(), 200);
        assert_eq!(SparseIndex::new(0.3).step(), 4);
        assert_eq!(SparseIndex::with_step(0).step(), 1);
    }

    #[test]
    fn records_only_sampled_indexes() {
        let mut index = SparseIndex::with_step(5);
        let recorded: Vec<u64> = (1..=20)
            .filter(|&i| index.index(i, i * 100))
            .collect();

        assert_eq!(recorded, vec![5, 10, 15, 20]);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn lookup_returns_floor() {
        let mut index = SparseIndex::with_step(5);
        for i in 1..=20 {
            index.index(i, i * 100);
        }

        assert_eq!(index.lookup(4), None);
        assert_eq!(
            index.lookup(5),
            Some(Position {
                index: 5,
                position: 500
            })
        );
        assert_eq!(index.lookup(14).map(|p| p.index), Some(10));
        assert_eq!(index.lookup(u64::MAX).map(|p| p.index), Some(20));
    }

    #[test]
    fn truncate_drops_entries_above() {
        let mut index = SparseIndex::with_step(5);
        for i in 1..=20 {
            index.index(i, i * 100);
        }

        index.truncate(10);
        assert_eq!(index.lookup(19).map(|p| p.index), Some(10));

        index.truncate(9);
        assert_eq!(index.lookup(19).map(|p| p.index), Some(5));

        index.truncate(u64::MAX);
        assert_eq!(index.len(), 1);

        index.truncate(0);
        assert!(index.is_empty());
    }

    #[test]
    fn reindexing_overwrites_position() {
        let mut index = SparseIndex::with_step(1);
        index.index(3, 300);
        index.index(3, 310);
        assert_eq!(index.lookup(3).map(|p| p.position), Some(310));
        index.clear();
        assert!(index.is_empty());
    }
}
