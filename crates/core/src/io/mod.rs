//! I/O operations for reading and writing geospatial data

mod geojson;
mod native;

pub use geojson::{read_boundary, read_geojson, read_geojson_from_str};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, read_geotiff_info, write_geotiff,
    write_geotiff_to_buffer, RasterInfo,
};
