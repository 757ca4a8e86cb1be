//! Empirical neighbourhood calibration
//!
//! Two land-use maps of the same area, taken at different times, are
//! compared cell by cell. The neighbourhoods of the cells that changed
//! class are tested against the neighbourhoods of the whole landscape,
//! and neighbour classes that are both over-represented and significant
//! become attraction rules for the destination class.
//!
//! Pipeline:
//! 1. [`DistanceCatalog`]: rings of equal distance up to the maximum radius
//! 2. [`evaluate_neighbourhoods`]: per-ring neighbour count tables
//! 3. [`enrichment_factors`]: observed over expected neighbour shares
//! 4. [`significance_z_scores`]: Mann–Whitney z-scores per ring
//! 5. [`derive_rules`]: binary rule matrix
//!
//! [`calibrate`] runs all of them.

mod config;
mod distances;
mod enrichment;
mod evaluator;
mod rules;
mod significance;
mod tables;

pub use config::{CalibrationParams, ClassRoles, RulePolicy};
pub use distances::{DistanceCatalog, Ring, RingGrouping};
pub use enrichment::{enrichment_factors, log_enrichment};
pub use evaluator::{evaluate_neighbourhoods, NeighbourhoodCounts};
pub use rules::{derive_rules, AttractionRules};
pub use significance::significance_z_scores;
pub use tables::{NeighbourProfile, NeighbourTable, Transition, TransitionDictionary};

use encal_core::raster::Raster;
use encal_core::Result;
use ndarray::Array3;
use tracing::debug;

/// Everything computed by a calibration run
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Rings analysed
    pub catalog: DistanceCatalog,
    /// Neighbour count tables
    pub counts: NeighbourhoodCounts,
    /// Enrichment of the new cells, indexed (ring, destination, neighbour)
    pub enrichment: Array3<f64>,
    /// Base-10 log of `enrichment`, `None` where not evaluated
    pub log_enrichment: Array3<Option<f64>>,
    /// Rank-test z-scores, indexed (ring, destination, neighbour)
    pub z_scores: Array3<Option<f64>>,
    /// Derived attraction rules
    pub rules: AttractionRules,
}

/// Calibrate attraction rules from two land-use maps.
///
/// # Arguments
/// * `origin` - Land use at time 1, class codes `0..params.classes`
/// * `destination` - Land use at time 2
/// * `mask` - Cells with a value above zero are analysed
/// * `params` - Classes, roles, neighbourhood and rule policy
///
/// # Errors
/// Invalid parameters, rasters of different shape or a class code out of
/// range inside the mask.
pub fn calibrate(
    origin: &Raster<i32>,
    destination: &Raster<i32>,
    mask: &Raster<i32>,
    params: &CalibrationParams,
) -> Result<Calibration> {
    params.validate()?;
    origin.ensure_same_shape(destination)?;
    origin.ensure_same_shape(mask)?;

    let catalog = DistanceCatalog::new(params.max_distance, params.grouping);
    debug!(
        rings = catalog.len(),
        reach = catalog.reach(),
        "distance catalog built"
    );

    let counts = evaluate_neighbourhoods(origin, destination, mask, params.classes, &catalog)?;
    debug!(
        valid_cells = counts.valid_cells(),
        transitions = counts.transitions.len(),
        "neighbourhoods evaluated"
    );

    let enrichment = counts.enrichment(&counts.new_cells());
    let log_enrichment = log_enrichment(&enrichment);
    let z_scores = significance_z_scores(&counts, &params.roles);
    let rules = derive_rules(&z_scores, &log_enrichment, &params.roles, &params.policy);
    debug!(
        rules = rules.matrix().iter().filter(|&&v| v == 1).count(),
        "attraction rules derived"
    );

    Ok(Calibration {
        catalog,
        counts,
        enrichment,
        log_enrichment,
        z_scores,
        rules,
    })
}
