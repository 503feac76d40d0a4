//! Coordinate Reference System handling
//!
//! Rasters and boundaries are assumed to share a CRS; it is carried as
//! metadata and written back to GeoTIFF geo-keys, never used to reproject.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether the EPSG code denotes a geographic (lat/lon) system.
    ///
    /// EPSG reserves 4000-4999 for geographic 2D systems.
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, Some(4000..=4999))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32722);
        assert_eq!(crs.epsg(), Some(32722));
        assert_eq!(crs.identifier(), "EPSG:32722");
        assert!(!crs.is_geographic());
    }

    #[test]
    fn test_crs_geographic_range() {
        assert!(CRS::from_epsg(4326).is_geographic());
        assert!(!CRS::from_wkt("LOCAL_CS[\"x\"]").is_geographic());
        assert_eq!(CRS::from_wkt("LOCAL_CS[\"x\"]").identifier(), "WKT:LOCAL_CS[\"x\"]");
    }
}
