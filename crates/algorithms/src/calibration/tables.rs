//! Neighbour count tables
//!
//! A [`NeighbourProfile`] summarises the neighbourhoods of one population
//! of cells: total neighbour occurrences per ring and class, and the
//! per-cell distribution of those counts that the rank test consumes.
//! A [`NeighbourTable`] holds one profile per land-use class.

use std::collections::BTreeMap;

use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Zip};
use serde::Serialize;

/// Counts for one population of cells
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourProfile {
    cells: u64,
    /// (ring, neighbour class) -> occurrences
    occurrences: Array2<u64>,
    /// (ring, neighbour class, k) -> cells with exactly k such neighbours
    frequencies: Array3<u64>,
}

impl NeighbourProfile {
    /// Empty profile for `rings` rings, `classes` classes and per-cell
    /// counts up to `max_count`
    pub fn new(rings: usize, classes: usize, max_count: usize) -> Self {
        Self {
            cells: 0,
            occurrences: Array2::zeros((rings, classes)),
            frequencies: Array3::zeros((rings, classes, max_count + 1)),
        }
    }

    /// Record one cell whose neighbour counts are `counts[(ring, class)]`
    pub fn record(&mut self, counts: ArrayView2<'_, u32>) {
        debug_assert_eq!(counts.dim(), self.occurrences.dim());
        self.cells += 1;
        for ((ring, class), &n) in counts.indexed_iter() {
            self.occurrences[(ring, class)] += u64::from(n);
            self.frequencies[(ring, class, n as usize)] += 1;
        }
    }

    /// Elementwise sum with another profile of the same shape
    pub fn merge(&mut self, other: &NeighbourProfile) {
        self.cells += other.cells;
        Zip::from(&mut self.occurrences)
            .and(&other.occurrences)
            .for_each(|a, &b| *a += b);
        Zip::from(&mut self.frequencies)
            .and(&other.frequencies)
            .for_each(|a, &b| *a += b);
    }

    /// Number of recorded cells
    pub fn cells(&self) -> u64 {
        self.cells
    }

    /// Occurrence array indexed (ring, neighbour class)
    pub fn occurrences(&self) -> &Array2<u64> {
        &self.occurrences
    }

    /// Occurrences of `class` in `ring` around the recorded cells
    pub fn occurrence(&self, ring: usize, class: usize) -> u64 {
        self.occurrences[(ring, class)]
    }

    /// Occurrences of every class in `ring`
    pub fn ring_total(&self, ring: usize) -> u64 {
        self.occurrences.row(ring).sum()
    }

    /// Histogram of per-cell counts of `class` in `ring`; entry `k` is the
    /// number of cells with exactly `k` neighbours of that class
    pub fn frequencies(&self, ring: usize, class: usize) -> ArrayView1<'_, u64> {
        self.frequencies.slice(ndarray::s![ring, class, ..])
    }
}

/// One profile per land-use class
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourTable {
    profiles: Vec<NeighbourProfile>,
}

impl NeighbourTable {
    /// Empty table, see [`NeighbourProfile::new`]
    pub fn new(rings: usize, classes: usize, max_count: usize) -> Self {
        Self {
            profiles: (0..classes)
                .map(|_| NeighbourProfile::new(rings, classes, max_count))
                .collect(),
        }
    }

    /// Number of classes (rows)
    pub fn classes(&self) -> usize {
        self.profiles.len()
    }

    /// Profile of the cells keyed by `class`
    pub fn profile(&self, class: usize) -> &NeighbourProfile {
        &self.profiles[class]
    }

    /// Mutable profile of the cells keyed by `class`
    pub fn profile_mut(&mut self, class: usize) -> &mut NeighbourProfile {
        &mut self.profiles[class]
    }

    /// Occurrences of `neighbour` in `ring` around cells keyed by `class`
    pub fn occurrences(&self, ring: usize, class: usize, neighbour: usize) -> u64 {
        self.profiles[class].occurrence(ring, neighbour)
    }

    /// Elementwise sum with another table of the same shape
    pub fn merge(&mut self, other: &NeighbourTable) {
        for (mine, theirs) in self.profiles.iter_mut().zip(&other.profiles) {
            mine.merge(theirs);
        }
    }

    /// All rows summed into a single profile
    pub fn aggregate(&self) -> Option<NeighbourProfile> {
        let mut iter = self.profiles.iter();
        let mut total = iter.next()?.clone();
        for profile in iter {
            total.merge(profile);
        }
        Some(total)
    }
}

/// A change of class between the two time slices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Transition {
    /// Class at time 1
    pub from: usize,
    /// Class at time 2
    pub to: usize,
}

impl Transition {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// Profiles of the cells that underwent each observed transition
pub type TransitionDictionary = BTreeMap<Transition, NeighbourProfile>;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_record_fills_both_views() {
        let mut p = NeighbourProfile::new(2, 3, 4);
        p.record(array![[4, 0, 0], [1, 2, 1]].view());
        p.record(array![[2, 2, 0], [0, 0, 4]].view());

        assert_eq!(p.cells(), 2);
        assert_eq!(p.occurrence(0, 0), 6);
        assert_eq!(p.ring_total(1), 8);
        assert_eq!(p.frequencies(0, 0).to_vec(), vec![0, 0, 1, 0, 1]);
        assert_eq!(p.frequencies(1, 2).to_vec(), vec![0, 1, 0, 0, 1]);
        // every recorded cell lands in exactly one bin
        assert_eq!(p.frequencies(1, 1).sum(), 2);
    }

    #[test]
    fn test_merge_is_elementwise() {
        let mut a = NeighbourTable::new(1, 2, 2);
        let mut b = NeighbourTable::new(1, 2, 2);
        a.profile_mut(0).record(array![[1, 1]].view());
        b.profile_mut(0).record(array![[2, 0]].view());
        b.profile_mut(1).record(array![[0, 2]].view());

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.occurrences(0, 0, 0), 3);
        assert_eq!(ab.profile(1).cells(), 1);

        let total = ab.aggregate().unwrap();
        assert_eq!(total.cells(), 3);
        assert_eq!(total.occurrence(0, 1), 3);
    }

    #[test]
    fn test_transition_order() {
        let mut dict = TransitionDictionary::new();
        dict.insert(Transition::new(2, 0), NeighbourProfile::new(1, 3, 1));
        dict.insert(Transition::new(0, 2), NeighbourProfile::new(1, 3, 1));
        let keys: Vec<_> = dict.keys().copied().collect();
        assert_eq!(keys, vec![Transition::new(0, 2), Transition::new(2, 0)]);
    }
}
