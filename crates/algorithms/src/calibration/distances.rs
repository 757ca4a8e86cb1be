//! Neighbourhood distance rings
//!
//! A ring is the set of integer offsets `(dr, dc)` that share one
//! distance from the centre cell. The catalog lists the rings inside a
//! maximum radius in ascending order; ring `i` is the `i`-th nearest
//! distance analysed by the evaluator.

use serde::Serialize;

/// How offsets are grouped into rings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RingGrouping {
    /// One ring per exact Euclidean length (1, √2, 2, √5, ...)
    #[default]
    Exact,
    /// One ring per rounded radius (1, 2, 3, ...)
    Rounded,
}

/// One neighbourhood ring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ring {
    /// Distance in cells
    pub distance: f64,
    /// Offsets realising this distance, in row-major scan order
    pub offsets: Vec<(isize, isize)>,
}

impl Ring {
    /// Number of offsets in the ring, the most neighbours a cell can have at this distance
    pub fn size(&self) -> usize {
        self.offsets.len()
    }
}

/// Ordered, duplicate-free list of the rings within a maximum radius
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceCatalog {
    max_distance: usize,
    grouping: RingGrouping,
    rings: Vec<Ring>,
}

impl DistanceCatalog {
    /// Build the catalog for `max_distance` cells.
    ///
    /// An offset is part of the neighbourhood when its Euclidean length
    /// rounds (half up) to a radius below `max_distance`, so the largest
    /// analysed radius is `max_distance - 1`. A zero radius gives an empty
    /// catalog.
    ///
    /// ```
    /// use encal_algorithms::calibration::{DistanceCatalog, RingGrouping};
    ///
    /// let catalog = DistanceCatalog::new(3, RingGrouping::Exact);
    /// assert_eq!(catalog.len(), 4); // 1, √2, 2, √5
    /// assert_eq!(catalog.sizes(), vec![4, 4, 4, 8]);
    /// ```
    pub fn new(max_distance: usize, grouping: RingGrouping) -> Self {
        let r = max_distance as isize;
        // round(sqrt(s)) < m  <=>  sqrt(s) < m - 0.5  <=>  4s < (2m - 1)^2
        let limit = (2 * r - 1).pow(2);

        // (key, squared length, offset); the key is exact in both groupings
        let mut entries: Vec<(usize, usize, (isize, isize))> = Vec::new();
        for dr in -r..=r {
            for dc in -r..=r {
                let sq = dr * dr + dc * dc;
                if sq == 0 || max_distance == 0 || 4 * sq >= limit {
                    continue;
                }
                let sq = sq as usize;
                let key = match grouping {
                    RingGrouping::Exact => sq,
                    RingGrouping::Rounded => rounded_radius(sq),
                };
                entries.push((key, sq, (dr, dc)));
            }
        }
        // Stable sort keeps row-major order inside each ring.
        entries.sort_by_key(|&(key, _, _)| key);

        let mut rings: Vec<Ring> = Vec::new();
        let mut last_key = None;
        for (key, sq, offset) in entries {
            if last_key != Some(key) {
                let distance = match grouping {
                    RingGrouping::Exact => (sq as f64).sqrt(),
                    RingGrouping::Rounded => key as f64,
                };
                rings.push(Ring {
                    distance,
                    offsets: Vec::new(),
                });
                last_key = Some(key);
            }
            if let Some(ring) = rings.last_mut() {
                ring.offsets.push(offset);
            }
        }

        Self {
            max_distance,
            grouping,
            rings,
        }
    }

    /// Maximum radius the catalog was built for
    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// Grouping used to form the rings
    pub fn grouping(&self) -> RingGrouping {
        self.grouping
    }

    /// Number of distinct distances
    pub fn len(&self) -> usize {
        self.rings.len()
    }

    /// Whether no distance is analysed
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Rings, nearest first
    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Ring distances, ascending
    pub fn distances(&self) -> Vec<f64> {
        self.rings.iter().map(|r| r.distance).collect()
    }

    /// Ring sizes `N[d]`
    pub fn sizes(&self) -> Vec<usize> {
        self.rings.iter().map(Ring::size).collect()
    }

    /// Largest ring size, the upper bound of any per-cell neighbour count
    pub fn max_ring_size(&self) -> usize {
        self.rings.iter().map(Ring::size).max().unwrap_or(0)
    }

    /// Largest |dr| or |dc| reached by any offset
    pub fn reach(&self) -> usize {
        self.rings
            .iter()
            .flat_map(|r| r.offsets.iter())
            .map(|&(dr, dc)| dr.unsigned_abs().max(dc.unsigned_abs()))
            .max()
            .unwrap_or(0)
    }
}

/// Radius of an offset with squared length `sq`, rounded half up.
///
/// No integer `sq` sits exactly on a half, so the float round is exact.
fn rounded_radius(sq: usize) -> usize {
    (sq as f64).sqrt().round() as usize
}
