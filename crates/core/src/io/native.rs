//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O and interprets the GeoTIFF tags needed
//! to georeference a raster: pixel scale + tiepoint or the model
//! transformation matrix, the EPSG code from the geo-key directory and the
//! GDAL no-data tag.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{DataType, GeoTransform, Raster, RasterElement};
use ndarray::Array3;
use num_traits::NumCast;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{ColorType, Gray32Float, RGB32Float, RGBA32Float};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const USER_DEFINED: u16 = 32767;

/// Metadata of a GeoTIFF file, read without decoding the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub data_type: DataType,
    pub band_count: usize,
    pub rows: usize,
    pub cols: usize,
    pub transform: Option<GeoTransform>,
    pub crs: Option<CRS>,
    pub nodata: Option<f64>,
}

/// Read a GeoTIFF file into a Raster, keeping all bands.
///
/// Any number of pixel-interleaved samples is accepted, so GDAL's
/// multi-band MinIsBlack scenes read the same as RGB(A) files.
///
/// Samples are converted to `T`; values that do not fit become
/// `T::default_nodata()`.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    debug!("reading raster {}", path.display());
    let file = File::open(path)?;
    decode_geotiff(BufReader::new(file))
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data))
}

/// Read the metadata of a GeoTIFF file
pub fn read_geotiff_info<P: AsRef<Path>>(path: P) -> Result<RasterInfo> {
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(BufReader::new(file))?;

    let (width, height) = decoder.dimensions()?;
    let band_count = decoder
        .get_tag_u32(Tag::SamplesPerPixel)
        .map(|n| n as usize)
        .unwrap_or(1);
    let bits = first_sample_value(&mut decoder, Tag::BitsPerSample).unwrap_or(8);
    let sample_format = first_sample_value(&mut decoder, Tag::SampleFormat).unwrap_or(1);

    let data_type = match (sample_format, bits) {
        (1, 8) => DataType::UInt8,
        (1, 16) => DataType::UInt16,
        (1, 32) => DataType::UInt32,
        (1, 64) => DataType::UInt64,
        (2, 8) => DataType::Int8,
        (2, 16) => DataType::Int16,
        (2, 32) => DataType::Int32,
        (2, 64) => DataType::Int64,
        (3, 32) => DataType::Float32,
        (3, 64) => DataType::Float64,
        (fmt, bits) => {
            return Err(Error::UnsupportedDataType(format!(
                "sample format {} with {} bits",
                fmt, bits
            )))
        }
    };

    Ok(RasterInfo {
        data_type,
        band_count,
        rows: height as usize,
        cols: width as usize,
        transform: read_geotransform(&mut decoder),
        crs: read_crs(&mut decoder),
        nodata: read_nodata(&mut decoder),
    })
}

/// Per-sample tags hold a single value for one band and a list for several.
fn first_sample_value<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Option<u32> {
    if let Ok(Some(value)) = decoder.find_tag_unsigned::<u32>(tag) {
        return Some(value);
    }
    decoder
        .get_tag_u32_vec(tag)
        .ok()
        .and_then(|v| v.first().copied())
}

fn cast_samples<S, T>(buf: &[S]) -> Vec<T>
where
    S: NumCast + Copy,
    T: RasterElement,
{
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Internal: decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = match decoder.read_image()? {
        DecodingResult::U8(buf) => cast_samples(&buf),
        DecodingResult::U16(buf) => cast_samples(&buf),
        DecodingResult::U32(buf) => cast_samples(&buf),
        DecodingResult::U64(buf) => cast_samples(&buf),
        DecodingResult::I8(buf) => cast_samples(&buf),
        DecodingResult::I16(buf) => cast_samples(&buf),
        DecodingResult::I32(buf) => cast_samples(&buf),
        DecodingResult::I64(buf) => cast_samples(&buf),
        DecodingResult::F32(buf) => cast_samples(&buf),
        DecodingResult::F64(buf) => cast_samples(&buf),
        #[allow(unreachable_patterns)]
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let pixels = rows * cols;
    if pixels == 0 || data.len() % pixels != 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }
    let bands = data.len() / pixels;

    // Samples are pixel-interleaved: (row, col, band) -> (band, row, col)
    let interleaved = Array3::from_shape_vec((rows, cols, bands), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    let planar = interleaved
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned();

    let mut raster = Raster::from_array3(planar);
    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(read_nodata(&mut decoder).and_then(num_traits::cast));

    Ok(raster)
}

/// Read the GeoTransform from the model transformation matrix, or from the
/// pixel scale + tiepoint pair.
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(matrix) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        return GeoTransform::from_model_transformation(&matrix);
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z]
        // scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    None
}

/// Read the EPSG code from the geo-key directory
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    if keys.len() < 4 {
        return None;
    }

    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_KEY => return Some(CRS::from_epsg(value as u32)),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(CRS::from_epsg(value as u32)),
            _ => {}
        }
    }
    geographic
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f64>()
        .ok()
}

/// Write a Raster to a GeoTIFF file as 32-bit float
///
/// Rasters with 1, 3 or 4 bands are supported.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    debug!(
        "writing {}x{}x{} raster to {}",
        raster.band_count(),
        raster.rows(),
        raster.cols(),
        path.display()
    );
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

/// Internal: encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;

    // Pixel-interleaved f32 samples: iterate (row, col, band)
    let interleaved = raster.data().view().permuted_axes([1, 2, 0]);
    let data: Vec<f32> = interleaved
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    match raster.band_count() {
        1 => encode_image::<Gray32Float, _, _>(&mut encoder, raster, &data),
        3 => encode_image::<RGB32Float, _, _>(&mut encoder, raster, &data),
        4 => encode_image::<RGBA32Float, _, _>(&mut encoder, raster, &data),
        n => Err(Error::UnsupportedDataType(format!(
            "cannot write a {}-band raster; 1, 3 or 4 bands are supported",
            n
        ))),
    }
}

fn encode_image<C, T, W>(encoder: &mut TiffEncoder<W>, raster: &Raster<T>, data: &[f32]) -> Result<()>
where
    C: ColorType<Inner = f32>,
    T: RasterElement,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    let mut image = encoder.new_image::<C>(cols as u32, rows as u32)?;
    let gt = raster.transform();

    if gt.is_north_up() {
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        image
            .encoder()
            .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;

        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image
            .encoder()
            .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    } else {
        let matrix = gt.to_model_transformation();
        image
            .encoder()
            .write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }

    // GTModelTypeGeoKey: 1 = projected, 2 = geographic.
    // GTRasterTypeGeoKey: 1 = RasterPixelIsArea.
    let crs_code = raster
        .crs()
        .and_then(|crs| crs.epsg())
        .and_then(|code| u16::try_from(code).ok());
    let geographic = raster.crs().is_some_and(|crs| crs.is_geographic());
    let mut geokeys: Vec<u16> = vec![
        1, 1, 0, 2,
        GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 },
        GT_RASTER_TYPE_KEY, 0, 1, 1,
    ];
    if let Some(code) = crs_code {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        geokeys.extend_from_slice(&[key, 0, 1, code]);
        geokeys[3] = 3;
    }
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, &geokeys[..])?;

    if let Some(nodata) = raster.nodata().and_then(|v| v.to_f64()) {
        let text = nodata_text(nodata);
        image
            .encoder()
            .write_tag(Tag::GdalNodata, text.as_str())?;
    }

    image.write_data(data)?;
    Ok(())
}

fn nodata_text(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        value.to_string()
    }
}
