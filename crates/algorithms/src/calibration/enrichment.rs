//! Enrichment factors
//!
//! The enrichment of neighbour class `q` around the cells of row `p` at a
//! ring is the share of `q` among all neighbour occurrences in that ring,
//! divided by the share of `q` in the whole valid area:
//!
//! ```text
//! EF[d][p][q] = (occ[d][p][q] / sum_q' occ[d][p][q']) / (cells[q] / sum_c cells[c])
//! ```
//!
//! `EF > 1` means `q` is over-represented near `p` compared to a random
//! landscape with the same composition. Any zero denominator yields `0`,
//! which downstream code reads as "not evaluated".

use ndarray::Array3;

use super::tables::NeighbourTable;

/// Enrichment factors indexed (ring, row class, neighbour class)
///
/// # Arguments
/// * `table` - Counts to evaluate, one row per class
/// * `proportions` - Expected share of each class, usually the areal
///   proportions at time 1
pub fn enrichment_factors(table: &NeighbourTable, proportions: &[f64]) -> Array3<f64> {
    let classes = table.classes();
    let rings = if classes == 0 {
        0
    } else {
        table.profile(0).occurrences().nrows()
    };
    let mut ef = Array3::zeros((rings, classes, classes));

    for p in 0..classes {
        let profile = table.profile(p);
        for d in 0..rings {
            let total = profile.ring_total(d);
            if total == 0 {
                continue;
            }
            for (q, &expected) in proportions.iter().enumerate().take(classes) {
                let observed = profile.occurrence(d, q);
                if observed == 0 || expected <= 0.0 {
                    continue;
                }
                ef[(d, p, q)] = (observed as f64 / total as f64) / expected;
            }
        }
    }

    ef
}

/// Base-10 logarithm of the enrichment factors, `None` where not evaluated
pub fn log_enrichment(ef: &Array3<f64>) -> Array3<Option<f64>> {
    ef.mapv(|v| if v > 0.0 { Some(v.log10()) } else { None })
}
