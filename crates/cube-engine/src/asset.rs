//! Asset descriptors and the I/O collaborator contract.
//!
//! Assets are produced by an external catalog/discovery collaborator and are
//! read-only to the engine. The engine never touches files or the network
//! itself: native data is fetched through the [`AssetReader`] trait, keyed
//! by each asset's opaque `source` handle.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use cube_common::{BoundingBox, CrsCode, Geometry, TemporalExtent};
use serde::{Deserialize, Serialize};

/// The kind of data an asset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Raster,
    Vector,
    Point,
}

/// A discovered geospatial asset.
///
/// One asset may contribute to multiple bands and multiple time-slices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identifier; also defines the merge order across assets.
    pub id: String,
    pub kind: AssetKind,
    /// Spatial extent in the asset's native CRS.
    pub bbox: BoundingBox,
    /// Optional exact footprint geometry (native CRS). Falls back to `bbox`.
    pub footprint: Option<Geometry>,
    /// Native coordinate system.
    pub crs: CrsCode,
    /// Temporal extent: a single instant or an interval.
    pub extent: TemporalExtent,
    /// Declared band / attribute names.
    pub bands: BTreeSet<String>,
    /// Alias name -> declared band name (e.g. "red" -> "B04").
    pub aliases: BTreeMap<String, String>,
    /// Opaque handle understood by the I/O collaborator.
    pub source: String,
}

impl Asset {
    /// Create an asset with no footprint geometry and no aliases.
    pub fn new(
        id: impl Into<String>,
        kind: AssetKind,
        bbox: BoundingBox,
        crs: CrsCode,
        extent: TemporalExtent,
        bands: impl IntoIterator<Item = String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            bbox,
            footprint: None,
            crs,
            extent,
            bands: bands.into_iter().collect(),
            aliases: BTreeMap::new(),
            source: source.into(),
        }
    }

    /// The asset's footprint bbox, preferring the exact geometry when set.
    pub fn footprint_bbox(&self) -> BoundingBox {
        self.footprint
            .as_ref()
            .and_then(|g| g.bbox())
            .unwrap_or(self.bbox)
    }
}

/// Regular source pixel grid of a raster asset.
#[derive(Debug, Clone)]
pub struct SourceGrid {
    /// Extent in the source CRS, covering full pixel edges.
    pub bbox: BoundingBox,
    pub crs: CrsCode,
    /// Number of columns.
    pub width: usize,
    /// Number of rows (row 0 at the top / max_y edge).
    pub height: usize,
}

impl SourceGrid {
    /// Pixel size in source CRS units.
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.bbox.width() / self.width as f64,
            self.bbox.height() / self.height as f64,
        )
    }

    /// Fractional pixel coordinates for a source-CRS point.
    ///
    /// Integer values land on pixel centers, matching the convention the
    /// interpolation kernels expect. May fall outside `[0, width/height)`.
    pub fn fractional_cell(&self, x: f64, y: f64) -> (f64, f64) {
        let (res_x, res_y) = self.resolution();
        let col = (x - self.bbox.min_x) / res_x - 0.5;
        let row = (self.bbox.max_y - y) / res_y - 0.5;
        (col, row)
    }
}

/// One band of raster data, row-major, top-to-bottom.
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub name: String,
    pub data: Vec<f64>,
    /// Sentinel marking missing source cells, if any.
    pub nodata: Option<f64>,
}

/// Native data of a raster asset.
#[derive(Debug, Clone)]
pub struct RasterData {
    pub grid: SourceGrid,
    pub bands: Vec<RasterBand>,
}

/// A single vector feature with numeric attributes.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, f64>,
    /// Per-feature timestamp; falls back to the asset's nominal time.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Native data of a vector asset.
#[derive(Debug, Clone)]
pub struct VectorData {
    pub crs: CrsCode,
    /// Features in source order; draw order for overlap resolution.
    pub features: Vec<Feature>,
}

/// A single point observation with numeric values per band.
#[derive(Debug, Clone)]
pub struct PointObservation {
    pub x: f64,
    pub y: f64,
    /// Per-observation timestamp; falls back to the asset's nominal time.
    pub timestamp: Option<DateTime<Utc>>,
    pub values: BTreeMap<String, f64>,
}

/// Native data of a point asset.
#[derive(Debug, Clone)]
pub struct PointData {
    pub crs: CrsCode,
    /// Observations in stable source order.
    pub observations: Vec<PointObservation>,
}

/// The I/O collaborator: fetches an asset's native data on request.
///
/// Implementations own format decoding, network retries and timeouts;
/// failures surface to the engine as asset-load errors.
pub trait AssetReader: Send + Sync {
    fn read_raster(&self, asset: &Asset) -> anyhow::Result<RasterData>;
    fn read_vector(&self, asset: &Asset) -> anyhow::Result<VectorData>;
    fn read_points(&self, asset: &Asset) -> anyhow::Result<PointData>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_grid_fractional_cell() {
        let grid = SourceGrid {
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            crs: CrsCode::Epsg4326,
            width: 10,
            height: 10,
        };
        assert_eq!(grid.resolution(), (1.0, 1.0));

        // Center of the top-left pixel
        let (col, row) = grid.fractional_cell(0.5, 9.5);
        assert!((col - 0.0).abs() < 1e-12);
        assert!((row - 0.0).abs() < 1e-12);

        // Center of the bottom-right pixel
        let (col, row) = grid.fractional_cell(9.5, 0.5);
        assert!((col - 9.0).abs() < 1e-12);
        assert!((row - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_footprint_bbox_prefers_geometry() {
        let mut asset = Asset::new(
            "a",
            AssetKind::Vector,
            BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            CrsCode::Epsg4326,
            TemporalExtent::Instant(chrono::Utc::now()),
            vec![],
            "mem://a",
        );
        assert_eq!(asset.footprint_bbox().max_x, 100.0);

        asset.footprint = Some(Geometry::Polygon {
            exterior: vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            holes: vec![],
        });
        assert_eq!(asset.footprint_bbox().max_x, 10.0);
    }
}
