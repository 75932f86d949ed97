//! Kind-specific transformers.
//!
//! Each transformer consumes one asset's native data plus the reference
//! frame and emits zero or more [`Contribution`]s: a band name, a time-slice
//! bucket and a frame-aligned partial grid with a validity mask. The merge
//! engine consumes all three kinds identically.

mod point;
mod raster;
mod vector;

pub use point::transform_points;
pub use raster::transform_raster;
pub use vector::transform_vector;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::{AssetKind, AssetReader};
use crate::config::LoadConfig;
use crate::error::{CubeError, CubeResult};
use crate::filter::PlannedAsset;
use crate::frame::ReferenceFrame;

/// A frame-aligned grid covering only the cells one asset contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialGrid {
    /// Row-major cell values; NaN where invalid.
    pub values: Vec<f64>,
    /// Validity mask: true where the asset actually covered the cell.
    pub valid: Vec<bool>,
}

impl PartialGrid {
    /// An all-invalid grid of `len` cells.
    pub fn empty(len: usize) -> Self {
        Self {
            values: vec![f64::NAN; len],
            valid: vec![false; len],
        }
    }

    /// Mark one cell valid with a value.
    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
        self.valid[index] = !value.is_nan();
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }
}

/// One (band, time-slice, partial grid) triple produced by a transformer.
#[derive(Debug, Clone)]
pub struct Contribution {
    pub band: String,
    pub bucket: DateTime<Utc>,
    pub grid: PartialGrid,
}

/// Raster resampling method.
///
/// Nearest preserves exact values and is the safe default for categorical
/// data; continuous fields may use bilinear or cubic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    #[default]
    Nearest,
    Bilinear,
    Cubic,
}

impl Resampling {
    /// Parse from string (case-insensitive); unknown values fall back to
    /// nearest.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bilinear" => Self::Bilinear,
            "cubic" | "bicubic" => Self::Cubic,
            _ => Self::Nearest,
        }
    }
}

/// Fetch one asset's native data and transform it onto the frame.
///
/// Dispatches on the asset kind; the per-kind modules own the alignment
/// logic. Read failures surface as `AssetLoad`, alignment failures as
/// `Transform`.
pub fn transform_asset(
    reader: &dyn AssetReader,
    planned: &PlannedAsset,
    frame: &ReferenceFrame,
    config: &LoadConfig,
) -> CubeResult<Vec<Contribution>> {
    let asset = &planned.asset;
    let bucket = config.time_groupby.bucket(asset.extent.nominal());

    match asset.kind {
        AssetKind::Raster => {
            let data = reader
                .read_raster(asset)
                .map_err(|e| CubeError::asset_load(&asset.id, e))?;
            transform_raster(&data, planned, frame, bucket, config.resampling)
        }
        AssetKind::Vector => {
            let data = reader
                .read_vector(asset)
                .map_err(|e| CubeError::asset_load(&asset.id, e))?;
            transform_vector(&data, planned, frame, config)
        }
        AssetKind::Point => {
            let data = reader
                .read_points(asset)
                .map_err(|e| CubeError::asset_load(&asset.id, e))?;
            transform_points(&data, planned, frame, config)
        }
    }
}

/// Inclusive check of a resolved row timestamp against the load window.
///
/// The temporal filter admits whole assets by extent overlap; rows carrying
/// their own timestamps still have to land inside the window individually.
pub(crate) fn within_window(
    ts: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> bool {
    start.map_or(true, |s| ts >= s) && end.map_or(true, |e| ts <= e)
}

/// Sample a source grid at fractional pixel coordinates.
///
/// Integer coordinates land on pixel centers. Returns NaN outside the grid
/// or where the source itself is NaN.
pub(crate) fn sample(
    data: &[f64],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    method: Resampling,
) -> f64 {
    match method {
        Resampling::Nearest => sample_nearest(data, width, height, x, y),
        Resampling::Bilinear => sample_bilinear(data, width, height, x, y),
        Resampling::Cubic => sample_cubic(data, width, height, x, y),
    }
}

fn sample_nearest(data: &[f64], width: usize, height: usize, x: f64, y: f64) -> f64 {
    if x < -0.5 || y < -0.5 {
        return f64::NAN;
    }
    let col = x.round() as usize;
    let row = y.round() as usize;

    if col >= width || row >= height {
        return f64::NAN;
    }

    data[row * width + col]
}

fn sample_bilinear(data: &[f64], width: usize, height: usize, x: f64, y: f64) -> f64 {
    if x < 0.0 || y < 0.0 {
        // Inside the outermost half-pixel ring, fall back to nearest
        return sample_nearest(data, width, height, x, y);
    }
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;

    if x0 >= width || y0 >= height {
        return f64::NAN;
    }

    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = x - x0 as f64;
    let yf = y - y0 as f64;

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    // If any corner is NaN, the interpolated value is undefined
    if v00.is_nan() || v10.is_nan() || v01.is_nan() || v11.is_nan() {
        return f64::NAN;
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    top * (1.0 - yf) + bottom * yf
}

fn sample_cubic(data: &[f64], width: usize, height: usize, x: f64, y: f64) -> f64 {
    if x < 0.0 || y < 0.0 || x > (width - 1) as f64 || y > (height - 1) as f64 {
        return sample_bilinear(data, width, height, x, y);
    }
    let xi = x.floor() as i64;
    let yi = y.floor() as i64;

    let xf = x - xi as f64;
    let yf = y - yi as f64;

    // Sample 4x4 neighborhood, clamped at the edges
    let mut values = [[0.0f64; 4]; 4];
    for (j, row) in values.iter_mut().enumerate() {
        for (i, v) in row.iter_mut().enumerate() {
            let px = (xi + i as i64 - 1).clamp(0, width as i64 - 1) as usize;
            let py = (yi + j as i64 - 1).clamp(0, height as i64 - 1) as usize;
            *v = data[py * width + px];

            // Any NaN neighbor: fall back to bilinear
            if v.is_nan() {
                return sample_bilinear(data, width, height, x, y);
            }
        }
    }

    let mut rows = [0.0f64; 4];
    for (j, row) in values.iter().enumerate() {
        rows[j] = cubic_1d(row[0], row[1], row[2], row[3], xf);
    }
    cubic_1d(rows[0], rows[1], rows[2], rows[3], yf)
}

/// 1D cubic interpolation using a Catmull-Rom spline.
fn cubic_1d(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_nearest() {
        let data = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(sample_nearest(&data, 2, 2, 0.0, 0.0), 1.0);
        assert_eq!(sample_nearest(&data, 2, 2, 0.9, 0.9), 4.0);
        assert!(sample_nearest(&data, 2, 2, 2.0, 0.0).is_nan());
        assert!(sample_nearest(&data, 2, 2, -1.0, 0.0).is_nan());
    }

    #[test]
    fn test_sample_bilinear() {
        let data = vec![0.0, 10.0, 20.0, 30.0];
        // Midpoint of the 2x2 grid
        let v = sample_bilinear(&data, 2, 2, 0.5, 0.5);
        assert!((v - 15.0).abs() < 1e-12);
        // NaN corner poisons the interpolation
        let data = vec![0.0, f64::NAN, 20.0, 30.0];
        assert!(sample_bilinear(&data, 2, 2, 0.5, 0.5).is_nan());
    }

    #[test]
    fn test_sample_cubic_flat_field() {
        let data = vec![7.0; 16];
        let v = sample_cubic(&data, 4, 4, 1.5, 1.5);
        assert!((v - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_grid_set() {
        let mut grid = PartialGrid::empty(4);
        grid.set(1, 5.0);
        grid.set(2, f64::NAN);
        assert_eq!(grid.valid, vec![false, true, false, false]);
        assert_eq!(grid.valid_count(), 1);
    }

    #[test]
    fn test_within_window_inclusive() {
        use chrono::TimeZone;
        let t = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        assert!(within_window(t, None, None));
        assert!(within_window(t, Some(t), Some(t)));
        assert!(!within_window(
            t,
            Some(Utc.with_ymd_and_hms(2023, 6, 2, 0, 0, 0).unwrap()),
            None
        ));
        assert!(!within_window(
            t,
            None,
            Some(Utc.with_ymd_and_hms(2023, 5, 31, 0, 0, 0).unwrap())
        ));
    }

    #[test]
    fn test_resampling_parse() {
        assert_eq!(Resampling::parse("BILINEAR"), Resampling::Bilinear);
        assert_eq!(Resampling::parse("bicubic"), Resampling::Cubic);
        assert_eq!(Resampling::parse("whatever"), Resampling::Nearest);
    }
}
