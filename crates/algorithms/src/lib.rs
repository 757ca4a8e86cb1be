//! # encal Algorithms
//!
//! Calibration of land-use attraction rules from two land-use maps.
//!
//! ## Modules
//!
//! - **calibration**: distance rings, neighbourhood count tables,
//!   enrichment factors, significance and rule derivation
//! - **statistics**: Mann–Whitney rank-sum test

pub mod calibration;
pub mod statistics;

pub(crate) mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::calibration::{
        calibrate, derive_rules, enrichment_factors, evaluate_neighbourhoods, log_enrichment,
        significance_z_scores, AttractionRules, Calibration, CalibrationParams, ClassRoles,
        DistanceCatalog, NeighbourhoodCounts, RingGrouping, RulePolicy, Transition,
    };
    pub use crate::statistics::MannWhitney;
    pub use encal_core::prelude::*;
}
