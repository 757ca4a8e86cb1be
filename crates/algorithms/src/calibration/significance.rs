//! Rank test of transition neighbourhoods against the population
//!
//! For every ring, active destination class `p` and neighbour class `q`,
//! the per-cell counts of `q` around the cells that became `p` are
//! compared with the counts around every valid cell using a Mann–Whitney
//! U test. A positive z-score means the new cells of `p` had more `q`
//! neighbours than the landscape at large.

use ndarray::Array3;

use crate::statistics::MannWhitney;

use super::config::ClassRoles;
use super::evaluator::NeighbourhoodCounts;

/// Z-scores indexed (ring, destination class, neighbour class).
///
/// Entries for non-active destinations, and tests that cannot be
/// evaluated (no new cells, or every count tied), are `None`.
pub fn significance_z_scores(
    counts: &NeighbourhoodCounts,
    roles: &ClassRoles,
) -> Array3<Option<f64>> {
    let classes = counts.classes();
    let rings = counts.rings();
    let mut z = Array3::from_elem((rings, classes, classes), None);

    let Some(population) = counts.all_cells.aggregate() else {
        return z;
    };
    let new_cells = counts.new_cells();

    for p in roles.active_classes().filter(|&p| p < classes) {
        let sample = new_cells.profile(p);
        if sample.cells() == 0 {
            continue;
        }
        for d in 0..rings {
            for q in 0..classes {
                z[(d, p, q)] = MannWhitney::from_frequencies(
                    sample.frequencies(d, q),
                    population.frequencies(d, q),
                )
                .map(|test| test.z);
            }
        }
    }

    z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::distances::{DistanceCatalog, RingGrouping};
    use crate::calibration::evaluator::evaluate_neighbourhoods;
    use encal_core::raster::Raster;

    #[test]
    fn test_no_transitions_gives_no_scores() {
        let map: Raster<i32> = Raster::from_vec(vec![0, 1, 0, 1, 0, 1, 0, 1, 0], 3, 3).unwrap();
        let mask = Raster::filled(3, 3, 1);
        let catalog = DistanceCatalog::new(2, RingGrouping::Exact);
        let counts = evaluate_neighbourhoods(&map, &map, &mask, 2, &catalog).unwrap();
        let roles = ClassRoles::from_counts(2, 0, 0).unwrap();

        let z = significance_z_scores(&counts, &roles);
        assert_eq!(z.dim(), (2, 2, 2));
        assert!(z.iter().all(Option::is_none));
    }

    #[test]
    fn test_only_active_destinations_are_tested() {
        // a 5x5 block of class 0 with a class-1 column; two cells change
        #[rustfmt::skip]
        let before: Vec<i32> = vec![
            0, 0, 1, 0, 0,
            0, 0, 1, 0, 0,
            0, 0, 1, 0, 0,
            0, 0, 1, 0, 0,
            0, 0, 1, 0, 0,
        ];
        let mut after = before.clone();
        after[6] = 1; // (1, 1) 0 -> 1
        after[17] = 0; // (3, 2) 1 -> 0
        let before = Raster::from_vec(before, 5, 5).unwrap();
        let after = Raster::from_vec(after, 5, 5).unwrap();
        let mask = Raster::filled(5, 5, 1);
        let catalog = DistanceCatalog::new(2, RingGrouping::Exact);
        let counts = evaluate_neighbourhoods(&before, &after, &mask, 2, &catalog).unwrap();

        // class 0 passive, class 1 active
        let roles = ClassRoles::from_counts(2, 1, 0).unwrap();
        let z = significance_z_scores(&counts, &roles);
        assert!((0..2).all(|d| (0..2).all(|q| z[(d, 0, q)].is_none())));
        // the new class-1 cell sits next to the column, more than most cells
        assert!(z[(0, 1, 1)].unwrap() > 0.0);
    }
}
