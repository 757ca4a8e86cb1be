//! Statistical tests used by the calibration
//!
//! - **rank_sum**: Mann–Whitney U with mid-rank tie handling

pub mod rank_sum;

pub use rank_sum::{normal_cdf, MannWhitney};
