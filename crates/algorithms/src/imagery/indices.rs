//! Normalized difference vegetation index
//!
//! The index is computed in f64 and stored as f32. Undefined ratios (0/0,
//! or a no-data input) become NaN; a zero sum with a non-zero difference
//! becomes ±infinity. Neither is an error: those pixels are carried to the
//! aggregation step, which skips them.

use fieldndvi_core::raster::{Raster, RasterElement};
use fieldndvi_core::{Algorithm, Error, Result};
use ndarray::{Array3, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Band selection for NDVI (1-based band indices)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NdviParams {
    /// Red band, band 3 in 4-band BGRN scenes
    pub red_band: usize,
    /// Near-infrared band, band 4 in 4-band BGRN scenes
    pub nir_band: usize,
}

impl Default for NdviParams {
    fn default() -> Self {
        Self {
            red_band: 3,
            nir_band: 4,
        }
    }
}

/// NDVI stage
#[derive(Debug, Clone, Default)]
pub struct NdviIndex;

impl Algorithm for NdviIndex {
    type Input = Raster<f64>;
    type Output = Raster<f32>;
    type Params = NdviParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "NDVI"
    }

    fn description(&self) -> &'static str {
        "Normalized difference of the near-infrared and red bands"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        ndvi(&input, &params)
    }
}

/// Per-pixel normalized difference `(a - b) / (a + b)`.
///
/// Returns `None` when the ratio is undefined (0/0 or a NaN input).
/// A zero sum with a non-zero difference yields `Some(±inf)`.
#[inline]
pub fn normalized_difference_value(a: f64, b: f64) -> Option<f64> {
    let ratio = (a - b) / (a + b);
    (!ratio.is_nan()).then_some(ratio)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Values range from -1 to 1 for non-negative reflectances:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
///
/// The output has one f32 band, the input's grid, transform and CRS, and
/// NaN as no-data.
///
/// # Errors
/// `Error::Format` if the raster has fewer bands than the red and NIR
/// indices require (4 with the default parameters).
pub fn ndvi<T: RasterElement>(raster: &Raster<T>, params: &NdviParams) -> Result<Raster<f32>> {
    if params.red_band == 0 || params.nir_band == 0 {
        return Err(Error::InvalidParameter {
            name: "band",
            value: format!("red={}, nir={}", params.red_band, params.nir_band),
            reason: "band indices are 1-based".into(),
        });
    }

    let required = params.red_band.max(params.nir_band);
    if raster.band_count() < required {
        return Err(Error::Format(format!(
            "NDVI needs at least {} bands (red = band {}, nir = band {}), raster has {}",
            required,
            params.red_band,
            params.nir_band,
            raster.band_count()
        )));
    }

    let nir = raster.band(params.nir_band)?;
    let red = raster.band(params.red_band)?;
    debug!("computing NDVI over {}x{} pixels", raster.cols(), raster.rows());

    let data = normalized_difference_views(nir, red, raster.nodata(), raster.nodata());
    build_output(raster, data)
}

/// Compute the normalized difference between two single-band rasters:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference<T: RasterElement>(
    band_a: &Raster<T>,
    band_b: &Raster<T>,
) -> Result<Raster<f32>> {
    if band_a.shape() != band_b.shape() {
        return Err(Error::SizeMismatch {
            er: band_a.rows(),
            ec: band_a.cols(),
            ar: band_b.rows(),
            ac: band_b.cols(),
        });
    }

    let data = normalized_difference_views(
        band_a.band(1)?,
        band_b.band(1)?,
        band_a.nodata(),
        band_b.nodata(),
    );
    build_output(band_a, data)
}

fn normalized_difference_views<T: RasterElement>(
    a: ArrayView2<'_, T>,
    b: ArrayView2<'_, T>,
    nodata_a: Option<T>,
    nodata_b: Option<T>,
) -> Vec<f32> {
    let (rows, cols) = a.dim();

    (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f32::NAN; cols];
            for col in 0..cols {
                let va = a[(row, col)];
                let vb = b[(row, col)];

                if va.is_nodata(nodata_a) || vb.is_nodata(nodata_b) {
                    continue;
                }

                let (Some(fa), Some(fb)) = (va.to_f64(), vb.to_f64()) else {
                    continue;
                };

                if let Some(value) = normalized_difference_value(fa, fb) {
                    row_data[col] = value as f32;
                }
            }
            row_data
        })
        .collect()
}

fn build_output<T: RasterElement>(template: &Raster<T>, data: Vec<f32>) -> Result<Raster<f32>> {
    let (rows, cols) = template.shape();
    let mut output = template.with_same_meta::<f32>(1, rows, cols);
    output.set_nodata(Some(f32::NAN));
    *output.data_mut() =
        Array3::from_shape_vec((1, rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
