//! Common test fixtures for geocube tests.
//!
//! Provides an in-memory asset reader plus builders for the asset and frame
//! shapes most tests need.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use cube_common::{BoundingBox, CrsCode, TemporalExtent};
use cube_engine::asset::{
    Asset, AssetKind, AssetReader, PointData, RasterBand, RasterData, SourceGrid, VectorData,
};
use cube_engine::frame::{GridTransform, ReferenceFrame};

/// Common bounding box definitions for testing.
pub mod bbox {
    /// Global bounding box (-180 to 180, -90 to 90)
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// A small farm-scale extent in degrees
    pub const FIELD: (f64, f64, f64, f64) = (149.0, -35.0, 149.1, -34.9);

    /// Unit square at the origin
    pub const UNIT: (f64, f64, f64, f64) = (0.0, 0.0, 1.0, 1.0);
}

/// In-memory [`AssetReader`] backed by maps keyed on the asset's `source`.
///
/// Reads for unknown sources fail, which makes the reader double as a
/// failure injector for error-mode tests. A call counter is kept so tests
/// can assert how often the engine went to the collaborator.
#[derive(Default)]
pub struct MemoryReader {
    rasters: HashMap<String, RasterData>,
    vectors: HashMap<String, VectorData>,
    points: HashMap<String, PointData>,
    reads: Mutex<usize>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raster(mut self, source: impl Into<String>, data: RasterData) -> Self {
        self.rasters.insert(source.into(), data);
        self
    }

    pub fn with_vector(mut self, source: impl Into<String>, data: VectorData) -> Self {
        self.vectors.insert(source.into(), data);
        self
    }

    pub fn with_points(mut self, source: impl Into<String>, data: PointData) -> Self {
        self.points.insert(source.into(), data);
        self
    }

    /// Number of read calls served so far (including failures).
    pub fn read_count(&self) -> usize {
        *self.reads.lock().unwrap()
    }

    fn count(&self) {
        *self.reads.lock().unwrap() += 1;
    }
}

impl AssetReader for MemoryReader {
    fn read_raster(&self, asset: &Asset) -> anyhow::Result<RasterData> {
        self.count();
        self.rasters
            .get(&asset.source)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown raster source: {}", asset.source))
    }

    fn read_vector(&self, asset: &Asset) -> anyhow::Result<VectorData> {
        self.count();
        self.vectors
            .get(&asset.source)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown vector source: {}", asset.source))
    }

    fn read_points(&self, asset: &Asset) -> anyhow::Result<PointData> {
        self.count();
        self.points
            .get(&asset.source)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown point source: {}", asset.source))
    }
}

/// A degree-per-pixel frame with its top-left corner at (min_x, max_y).
pub fn frame(bbox: (f64, f64, f64, f64), rows: usize, cols: usize) -> ReferenceFrame {
    let (min_x, min_y, max_x, max_y) = bbox;
    ReferenceFrame::new(
        CrsCode::Epsg4326,
        GridTransform {
            origin_x: min_x,
            origin_y: max_y,
            pixel_width: (max_x - min_x) / cols as f64,
            pixel_height: (max_y - min_y) / rows as f64,
        },
        rows,
        cols,
    )
    .unwrap()
}

/// An asset with an instant extent on the given date and a `mem://{id}`
/// source handle.
pub fn asset(
    id: &str,
    kind: AssetKind,
    bbox: (f64, f64, f64, f64),
    date: (i32, u32, u32),
    bands: &[&str],
) -> Asset {
    let (min_x, min_y, max_x, max_y) = bbox;
    let (y, m, d) = date;
    Asset::new(
        id,
        kind,
        BoundingBox::new(min_x, min_y, max_x, max_y),
        CrsCode::Epsg4326,
        TemporalExtent::Instant(Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()),
        bands.iter().map(|b| b.to_string()),
        format!("mem://{id}"),
    )
}

/// Single-band raster data covering `bbox` with the given values.
pub fn raster(
    bbox: (f64, f64, f64, f64),
    width: usize,
    height: usize,
    band: &str,
    values: Vec<f64>,
) -> RasterData {
    let (min_x, min_y, max_x, max_y) = bbox;
    assert_eq!(values.len(), width * height, "value count must match grid");
    RasterData {
        grid: SourceGrid {
            bbox: BoundingBox::new(min_x, min_y, max_x, max_y),
            crs: CrsCode::Epsg4326,
            width,
            height,
        },
        bands: vec![RasterBand {
            name: band.to_string(),
            data: values,
            nodata: None,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reader_unknown_source_fails() {
        let reader = MemoryReader::new();
        let a = asset("a", AssetKind::Raster, bbox::UNIT, (2023, 1, 1), &["b"]);
        assert!(reader.read_raster(&a).is_err());
        assert_eq!(reader.read_count(), 1);
    }

    #[test]
    fn test_memory_reader_round_trip() {
        let data = raster(bbox::UNIT, 2, 2, "b", vec![1.0, 2.0, 3.0, 4.0]);
        let reader = MemoryReader::new().with_raster("mem://a", data);
        let a = asset("a", AssetKind::Raster, bbox::UNIT, (2023, 1, 1), &["b"]);
        let read = reader.read_raster(&a).unwrap();
        assert_eq!(read.bands[0].data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_frame_builder_covers_bbox() {
        let f = frame(bbox::UNIT, 4, 4);
        assert_eq!(f.len(), 16);
        assert_eq!(f.bbox(), BoundingBox::new(0.0, 0.0, 1.0, 1.0));
    }
}
