//! # fieldndvi algorithms
//!
//! The three per-scene processing stages.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: NDVI from the red and near-infrared bands
//! - **vector**: Masking and cropping a raster to a polygon boundary
//! - **statistics**: NaN-aware scene mean

pub mod imagery;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{ndvi, normalized_difference, NdviIndex, NdviParams};
    pub use crate::statistics::{scene_mean, SceneMean};
    pub use crate::vector::{clip_raster, ClipParams, RasterClip};
    pub use fieldndvi_core::prelude::*;
}
