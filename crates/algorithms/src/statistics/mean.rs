//! Scene mean
//!
//! Reduces a clipped single-band raster to one number. Cells that are
//! no-data, NaN or infinite do not contribute.

use fieldndvi_core::raster::{Raster, RasterElement};
use fieldndvi_core::{Algorithm, Error, Result};

/// Aggregation stage for clipped NDVI rasters
#[derive(Debug, Clone, Default)]
pub struct SceneMean;

impl Algorithm for SceneMean {
    type Input = Raster<f32>;
    type Output = f64;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "SceneMean"
    }

    fn description(&self) -> &'static str {
        "Mean of the finite, non-nodata cells of a single-band raster"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        scene_mean(&input)
    }
}

/// Mean of the valid cells of a single-band raster, accumulated in f64.
///
/// # Errors
/// - `Error::Format` if the raster has more than one band
/// - `Error::EmptyInput` if the raster has no cells, or none of them is
///   finite and not no-data
pub fn scene_mean<T: RasterElement>(raster: &Raster<T>) -> Result<f64> {
    if raster.band_count() > 1 {
        return Err(Error::Format(format!(
            "expected a single-band raster, got {} bands",
            raster.band_count()
        )));
    }
    if raster.is_empty() {
        return Err(Error::EmptyInput("raster has no cells".into()));
    }

    let nodata = raster.nodata();
    let (sum, count) = raster
        .data()
        .iter()
        .filter(|v| !v.is_nodata(nodata))
        .filter_map(|v| v.to_f64())
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        return Err(Error::EmptyInput(format!(
            "none of the {} cells holds a finite value",
            raster.len()
        )));
    }

    Ok(sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_skips_nan() {
        let mut r: Raster<f32> = Raster::filled(3, 3, f32::NAN);
        r.set(0, 0, 0.2).unwrap();
        r.set(1, 1, 0.4).unwrap();
        r.set(2, 2, 0.9).unwrap();

        assert_relative_eq!(scene_mean(&r).unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_skips_infinite_and_nodata() {
        let mut r: Raster<f64> = Raster::filled(2, 3, 1.0);
        r.set(0, 0, f64::INFINITY).unwrap();
        r.set(0, 1, f64::NEG_INFINITY).unwrap();
        r.set(0, 2, -9999.0).unwrap();
        r.set_nodata(Some(-9999.0));

        assert_relative_eq!(scene_mean(&r).unwrap(), 1.0);
    }

    #[test]
    fn test_mean_is_order_independent() {
        let values: Vec<f32> = (0..64).map(|i| (i as f32 * 0.37).sin()).collect();
        let forward = Raster::from_vec(values.clone(), 8, 8).unwrap();

        // Reverse the row order
        let reversed: Vec<f32> = values.chunks(8).rev().flatten().copied().collect();
        let shuffled = Raster::from_vec(reversed, 8, 8).unwrap();

        assert_relative_eq!(
            scene_mean(&forward).unwrap(),
            scene_mean(&shuffled).unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_all_nan_is_empty_input() {
        let r: Raster<f32> = Raster::filled(4, 4, f32::NAN);
        assert!(matches!(scene_mean(&r), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_zero_cells_is_empty_input() {
        let r: Raster<f32> = Raster::new(0, 0);
        assert!(matches!(scene_mean(&r), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_multiband_is_format_error() {
        let r: Raster<f32> = Raster::with_bands(2, 3, 3);
        assert!(matches!(scene_mean(&r), Err(Error::Format(_))));
    }

    #[test]
    fn test_integer_raster() {
        let r: Raster<u8> = Raster::from_vec(vec![1, 2, 3, 6], 2, 2).unwrap();
        assert_relative_eq!(scene_mean(&r).unwrap(), 3.0);
    }

    #[test]
    fn test_algorithm_trait() {
        let r: Raster<f32> = Raster::filled(2, 2, 0.25);
        assert_relative_eq!(SceneMean.execute_default(r).unwrap(), 0.25);
    }
}
