//! Raster clipping by a polygon boundary
//!
//! Pixels whose center falls outside the boundary are replaced by the
//! raster's no-data value. With cropping enabled the output is reduced to
//! the pixel window covering the boundary's bounding rectangle.

use fieldndvi_core::raster::{GeoTransform, Raster, RasterElement};
use fieldndvi_core::vector::Boundary;
use fieldndvi_core::{Algorithm, Error, Result};
use ndarray::{s, Array2, Axis, Zip};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for boundary clipping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipParams {
    /// Reduce the output to the window covering the boundary.
    /// When false the input extent is kept and only the mask is applied.
    pub crop: bool,
}

impl Default for ClipParams {
    fn default() -> Self {
        Self { crop: true }
    }
}

/// Clipping stage for NDVI rasters
#[derive(Debug, Clone)]
pub struct RasterClip {
    pub boundary: Boundary,
}

impl RasterClip {
    pub fn new(boundary: Boundary) -> Self {
        Self { boundary }
    }
}

impl Algorithm for RasterClip {
    type Input = Raster<f32>;
    type Output = Raster<f32>;
    type Params = ClipParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Clip"
    }

    fn description(&self) -> &'static str {
        "Mask and crop a raster to a polygon boundary"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        clip_raster(&input, &self.boundary, &params)
    }
}

/// Pixel window `[col_start, col_end) x [row_start, row_end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_start: usize,
    pub row_start: usize,
    pub col_end: usize,
    pub row_end: usize,
}

impl PixelWindow {
    pub fn cols(&self) -> usize {
        self.col_end - self.col_start
    }

    pub fn rows(&self) -> usize {
        self.row_end - self.row_start
    }
}

/// Pixel window covering the boundary's bounding rectangle.
///
/// All four corners go through the inverse transform, so rotated grids are
/// handled. The window is expanded outward to whole pixels and intersected
/// with the raster extent.
///
/// # Errors
/// `Error::Geometry` if the boundary does not overlap the raster.
pub fn boundary_window(
    transform: &GeoTransform,
    rows: usize,
    cols: usize,
    boundary: &Boundary,
) -> Result<PixelWindow> {
    let rect = boundary.bounds();
    let (min, max) = (rect.min(), rect.max());
    let corners = [(min.x, min.y), (min.x, max.y), (max.x, min.y), (max.x, max.y)];

    let mut col_lo = f64::INFINITY;
    let mut col_hi = f64::NEG_INFINITY;
    let mut row_lo = f64::INFINITY;
    let mut row_hi = f64::NEG_INFINITY;
    for (x, y) in corners {
        let (col, row) = transform.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() {
            return Err(Error::Geometry(
                "raster transform is degenerate, cannot locate boundary".into(),
            ));
        }
        col_lo = col_lo.min(col);
        col_hi = col_hi.max(col);
        row_lo = row_lo.min(row);
        row_hi = row_hi.max(row);
    }

    let clamp = |v: f64, limit: usize| v.max(0.0).min(limit as f64) as usize;
    let window = PixelWindow {
        col_start: clamp(col_lo.floor(), cols),
        row_start: clamp(row_lo.floor(), rows),
        col_end: clamp(col_hi.ceil(), cols),
        row_end: clamp(row_hi.ceil(), rows),
    };

    if window.col_start >= window.col_end || window.row_start >= window.row_end {
        return Err(Error::Geometry(format!(
            "boundary ({:.3}, {:.3}, {:.3}, {:.3}) does not overlap the raster",
            min.x, min.y, max.x, max.y
        )));
    }

    Ok(window)
}

/// Mask (and optionally crop) a raster to a boundary.
///
/// A pixel is kept when its center intersects the boundary; centers on an
/// edge or vertex are kept, centers inside a hole are not. Other pixels are
/// set to the raster's no-data value, or the type default (NaN for floats)
/// when it has none. The output no-data is set to that fill value.
///
/// Band count, sample type and CRS are preserved. When cropping, the
/// transform origin moves to the top-left corner of the window.
///
/// # Errors
/// `Error::Geometry` if the boundary does not overlap the raster.
pub fn clip_raster<T: RasterElement>(
    raster: &Raster<T>,
    boundary: &Boundary,
    params: &ClipParams,
) -> Result<Raster<T>> {
    let (rows, cols) = raster.shape();
    let transform = *raster.transform();
    let window = boundary_window(&transform, rows, cols, boundary)?;
    let fill = raster.nodata().unwrap_or_else(T::default_nodata);

    debug!(
        "clip window cols {}..{} rows {}..{} of {}x{}",
        window.col_start, window.col_end, window.row_start, window.row_end, cols, rows
    );

    // Only pixels inside the window can be covered; the rest of the
    // uncropped extent is masked without testing.
    let inside = window_mask(&transform, &window, boundary)?;

    let (out_window, mut output) = if params.crop {
        let data = raster
            .data()
            .slice(s![.., window.row_start..window.row_end, window.col_start..window.col_end])
            .to_owned();
        let mut out = Raster::from_array3(data);
        out.set_transform(transform.window(window.col_start, window.row_start));
        out.set_crs(raster.crs().cloned());
        let local = PixelWindow {
            col_start: 0,
            row_start: 0,
            col_end: window.cols(),
            row_end: window.rows(),
        };
        (local, out)
    } else {
        let mut out = raster.clone();
        let mut outside = Array2::from_elem((rows, cols), true);
        outside
            .slice_mut(s![window.row_start..window.row_end, window.col_start..window.col_end])
            .fill(false);
        for mut band in out.data_mut().axis_iter_mut(Axis(0)) {
            Zip::from(&mut band).and(&outside).for_each(|v, &o| {
                if o {
                    *v = fill;
                }
            });
        }
        (window, out)
    };

    for mut band in output.data_mut().axis_iter_mut(Axis(0)) {
        let mut view = band.slice_mut(s![
            out_window.row_start..out_window.row_end,
            out_window.col_start..out_window.col_end
        ]);
        Zip::from(&mut view).and(&inside).for_each(|v, &keep| {
            if !keep {
                *v = fill;
            }
        });
    }

    output.set_nodata(Some(fill));
    Ok(output)
}

/// Center-in-boundary test for every pixel of the window, row-parallel
fn window_mask(
    transform: &GeoTransform,
    window: &PixelWindow,
    boundary: &Boundary,
) -> Result<Array2<bool>> {
    let (rows, cols) = (window.rows(), window.cols());
    let flags: Vec<bool> = (window.row_start..window.row_end)
        .into_par_iter()
        .flat_map(|row| {
            (window.col_start..window.col_end)
                .map(|col| {
                    let (x, y) = transform.pixel_to_geo(col, row);
                    boundary.covers(x, y)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Array2::from_shape_vec((rows, cols), flags).map_err(|e| Error::Other(e.to_string()))
}
