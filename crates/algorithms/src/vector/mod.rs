//! Vector-driven raster operations
//!
//! - Clip: mask a raster to a polygon boundary and crop it to the
//!   boundary's pixel window

mod clip;

pub use clip::{boundary_window, clip_raster, ClipParams, PixelWindow, RasterClip};
