//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{DataType, GeoTransform, RasterElement};
use ndarray::{Array2, Array3, ArrayView2, ArrayViewMut2, Axis};

/// A georeferenced multi-band raster grid.
///
/// `Raster<T>` stores values of type `T` in a `(band, row, col)` grid with
/// associated geographic metadata (transform, CRS and no-data value). All
/// bands share the same dimensions and transform.
///
/// Bands are addressed with 1-based indices, following the usual remote
/// sensing convention (band 1 is the first band in the file).
///
/// # Example
///
/// ```ignore
/// use fieldndvi_core::Raster;
///
/// // Create a single-band 100x100 raster filled with zeros
/// let mut raster: Raster<f32> = Raster::new(100, 100);
///
/// // Set a value in band 1
/// raster.set(10, 20, 42.0)?;
///
/// // Read band 1 as a 2D view
/// let band = raster.band(1)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored as (band, row, col)
    data: Array3<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value, shared by all bands
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new single-band raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_bands(1, rows, cols)
    }

    /// Create a new raster with `bands` bands filled with zeros
    pub fn with_bands(bands: usize, rows: usize, cols: usize) -> Self {
        Self::from_array3(Array3::zeros((bands, rows, cols)))
    }

    /// Create a new single-band raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array3(Array3::from_elem((1, rows, cols), value))
    }

    /// Create a single-band raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array3::from_shape_vec((1, rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array3(array))
    }

    /// Create a single-band raster from a 2D array
    pub fn from_array(data: Array2<T>) -> Self {
        Self::from_array3(data.insert_axis(Axis(0)))
    }

    /// Create a raster from a `(band, row, col)` array
    pub fn from_array3(data: Array3<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Stack equally sized 2D bands into one raster
    pub fn from_bands(bands: Vec<Array2<T>>) -> Result<Self> {
        let Some(first) = bands.first() else {
            return Err(Error::InvalidDimensions { width: 0, height: 0 });
        };
        let (rows, cols) = first.dim();
        for band in &bands {
            if band.dim() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.nrows(),
                    ac: band.ncols(),
                });
            }
        }

        let views: Vec<ArrayView2<'_, T>> = bands.iter().map(|b| b.view()).collect();
        let data = ndarray::stack(Axis(0), &views).map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array3(data))
    }

    /// Create a raster with the same georeferencing but a different data type
    /// and shape. The no-data value is not carried over since its type changes.
    pub fn with_same_meta<U: RasterElement>(&self, bands: usize, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array3::zeros((bands, rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    // Dimensions

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Dimensions of one band as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Total number of cells across all bands
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample type of this raster
    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    // Band access

    fn band_axis_index(&self, band: usize) -> Result<usize> {
        if band == 0 || band > self.band_count() {
            return Err(Error::Format(format!(
                "band {} requested from a raster with {} band(s)",
                band,
                self.band_count()
            )));
        }
        Ok(band - 1)
    }

    /// View of band `band` (1-based)
    pub fn band(&self, band: usize) -> Result<ArrayView2<'_, T>> {
        let idx = self.band_axis_index(band)?;
        Ok(self.data.index_axis(Axis(0), idx))
    }

    /// Mutable view of band `band` (1-based)
    pub fn band_mut(&mut self, band: usize) -> Result<ArrayViewMut2<'_, T>> {
        let idx = self.band_axis_index(band)?;
        Ok(self.data.index_axis_mut(Axis(0), idx))
    }

    /// Iterate over all bands in order
    pub fn bands(&self) -> impl Iterator<Item = ArrayView2<'_, T>> {
        self.data.outer_iter()
    }

    // Data access (band 1)

    /// Get value at (row, col) of the first band
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((0, row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col) of the first band
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        self.set_band(1, row, col, value)
    }

    /// Set value at (row, col) of band `band` (1-based)
    pub fn set_band(&mut self, band: usize, row: usize, col: usize, value: T) -> Result<()> {
        let idx = self.band_axis_index(band)?;
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(idx, row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying `(band, row, col)` array
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array3<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Convert pixel coordinates to geographic coordinates (pixel center)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert geographic coordinates to fractional pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    // Statistics

    /// Basic statistics of one band (min, max, mean, count of valid cells)
    pub fn statistics(&self, band: usize) -> Result<RasterStatistics<T>> {
        let view = self.band(band)?;
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in view.iter() {
            if self.is_nodata(value) {
                continue;
            }
            let Some(v) = value.to_f64().filter(|v| v.is_finite()) else {
                continue;
            };

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }
            sum += v;
            count += 1;
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        Ok(RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: view.len() - count,
        })
    }
}

/// Basic statistics for one raster band
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}
