//! Imagery analysis algorithms
//!
//! Spectral index computed from multispectral scenes:
//! - Normalized difference: generic two-band ratio
//! - NDVI: normalized difference of near-infrared and red

mod indices;

pub use indices::{
    ndvi, normalized_difference, normalized_difference_value, NdviIndex, NdviParams,
};
