//! Statistical summaries of raster data
//!
//! - **mean**: NaN-aware mean of a single-band scene

mod mean;

pub use mean::{scene_mean, SceneMean};
