//! # fieldndvi core
//!
//! Core types, traits and I/O for the fieldndvi pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic multi-band raster grid type
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `Boundary`: Polygon union used to clip rasters
//! - Algorithm traits for consistent API
//! - I/O for GeoTIFF rasters and GeoJSON boundaries

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{DataType, GeoTransform, Raster, RasterElement};
pub use vector::Boundary;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{DataType, GeoTransform, Raster, RasterElement};
    pub use crate::vector::Boundary;
    pub use crate::Algorithm;
}

/// Core trait for the processing stages.
///
/// Stages are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
