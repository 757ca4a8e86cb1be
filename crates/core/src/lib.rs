//! # encal Core
//!
//! Core types and I/O for empirical neighbourhood calibration.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type used for land-use maps and masks
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `Error`: the error type shared by every encal crate
//! - I/O for ESRI ASCII grids

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
}
