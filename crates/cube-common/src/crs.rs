//! Coordinate Reference System types and transforms.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::BoundingBox;

/// Earth radius used by the spherical Web Mercator projection (meters).
const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Well-known CRS codes supported by the cube engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
    /// NAD83 Geographic (treated as WGS84 for transform purposes)
    Epsg4269,
    /// Web Mercator (meters)
    Epsg3857,
}

impl CrsCode {
    /// Parse a CRS identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:4326"
    /// - "4326"
    /// - "CRS:84" (equivalent to EPSG:4326)
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();
        let code = normalized.strip_prefix("EPSG:").unwrap_or(&normalized);

        match code {
            "4326" | "CRS:84" => Ok(CrsCode::Epsg4326),
            "4269" => Ok(CrsCode::Epsg4269),
            "3857" | "900913" => Ok(CrsCode::Epsg3857),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Parse from a bare EPSG integer code.
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        match code {
            4326 => Ok(CrsCode::Epsg4326),
            4269 => Ok(CrsCode::Epsg4269),
            3857 | 900913 => Ok(CrsCode::Epsg3857),
            _ => Err(CrsParseError::UnsupportedCrs(format!("EPSG:{code}"))),
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Epsg4269)
    }

    /// Get the valid bounds for this CRS.
    pub fn valid_bounds(&self) -> BoundingBox {
        match self {
            CrsCode::Epsg4326 | CrsCode::Epsg4269 => BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            CrsCode::Epsg3857 => {
                // Web Mercator bounds (approx ±85.06° latitude)
                let max_extent = 20_037_508.342_789_244;
                BoundingBox::new(-max_extent, -max_extent, max_extent, max_extent)
            }
        }
    }

    /// Transform a point from this CRS into `dst`.
    ///
    /// Geographic-to-geographic transforms are the identity (datum shifts
    /// between WGS84 and NAD83 are below grid resolution for this engine).
    pub fn transform_point(&self, dst: CrsCode, x: f64, y: f64) -> (f64, f64) {
        match (self.is_geographic(), dst.is_geographic()) {
            (true, true) | (false, false) => (x, y),
            (true, false) => geographic_to_mercator(x, y),
            (false, true) => mercator_to_geographic(x, y),
        }
    }

    /// Transform a bounding box from this CRS into `dst`.
    ///
    /// Latitudes are clamped to the Web Mercator valid range before
    /// projection so poles do not map to infinity.
    pub fn transform_bbox(&self, dst: CrsCode, bbox: &BoundingBox) -> BoundingBox {
        if self.is_geographic() == dst.is_geographic() {
            return *bbox;
        }

        let clamped = if self.is_geographic() && !dst.is_geographic() {
            BoundingBox::new(
                bbox.min_x.clamp(-180.0, 180.0),
                bbox.min_y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT),
                bbox.max_x.clamp(-180.0, 180.0),
                bbox.max_y.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT),
            )
        } else {
            *bbox
        };

        let (x0, y0) = self.transform_point(dst, clamped.min_x, clamped.min_y);
        let (x1, y1) = self.transform_point(dst, clamped.max_x, clamped.max_y);

        BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }
}

/// Maximum latitude representable in Web Mercator.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_6;

fn geographic_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = MERCATOR_RADIUS * lon.to_radians();
    let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    let y = MERCATOR_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

fn mercator_to_geographic(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            CrsCode::Epsg4326 => "EPSG:4326",
            CrsCode::Epsg4269 => "EPSG:4269",
            CrsCode::Epsg3857 => "EPSG:3857",
        };
        write!(f, "{}", code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
