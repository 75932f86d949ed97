//! The reference frame: the common spatial grid all assets are aligned to.

use cube_common::{BoundingBox, CrsCode};
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::error::{CubeError, CubeResult};

/// Affine mapping from grid indices to world coordinates.
///
/// Axis-aligned: the origin is the frame's top-left corner (min_x, max_y),
/// columns advance east by `pixel_width`, rows advance south by
/// `pixel_height`. Both pixel sizes are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GridTransform {
    /// World coordinates of a cell center.
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Cell indices containing a world coordinate, if non-negative.
    ///
    /// The caller still needs to bounds-check against the frame shape.
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - y) / self.pixel_height).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        Some((row as usize, col as usize))
    }
}

/// The immutable spatial grid for one cube build.
///
/// Constructed once per build and shared read-only by every downstream
/// component; all methods take `&self` so the frame can sit behind an `Arc`
/// across transformer workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    pub crs: CrsCode,
    pub transform: GridTransform,
    pub rows: usize,
    pub cols: usize,
}

impl ReferenceFrame {
    /// Create a frame, validating the shape and resolution invariants.
    pub fn new(
        crs: CrsCode,
        transform: GridTransform,
        rows: usize,
        cols: usize,
    ) -> CubeResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(CubeError::configuration(format!(
                "frame shape must be positive, got {rows}x{cols}"
            )));
        }
        if transform.pixel_width <= 0.0 || transform.pixel_height <= 0.0 {
            return Err(CubeError::configuration(format!(
                "frame resolution must be positive, got ({}, {})",
                transform.pixel_width, transform.pixel_height
            )));
        }
        Ok(Self {
            crs,
            transform,
            rows,
            cols,
        })
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Check if the frame is empty (never true for a validated frame).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The frame's bounding box in its own CRS.
    pub fn bbox(&self) -> BoundingBox {
        let t = &self.transform;
        BoundingBox::new(
            t.origin_x,
            t.origin_y - self.rows as f64 * t.pixel_height,
            t.origin_x + self.cols as f64 * t.pixel_width,
            t.origin_y,
        )
    }

    /// Flat row-major index for a cell.
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Cell indices for a world coordinate inside the frame.
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (row, col) = self.transform.world_to_cell(x, y)?;
        if row < self.rows && col < self.cols {
            Some((row, col))
        } else {
            None
        }
    }

    /// X coordinates of all cell centers, west to east.
    pub fn x_coords(&self) -> Vec<f64> {
        (0..self.cols)
            .map(|c| self.transform.cell_center(0, c).0)
            .collect()
    }

    /// Y coordinates of all cell centers, north to south.
    pub fn y_coords(&self) -> Vec<f64> {
        (0..self.rows)
            .map(|r| self.transform.cell_center(r, 0).1)
            .collect()
    }
}

/// How the reference frame is obtained for a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FrameSpec {
    /// Use a prebuilt frame unchanged.
    Explicit(ReferenceFrame),
    /// Derive a frame from a CRS plus shape and/or resolution.
    Derive(FrameDerivation),
}

/// Parameters for deriving a frame.
///
/// Requires a parseable CRS and at least one of `shape` / `resolution`.
/// When `bbox` is absent it is derived as the union of all candidate asset
/// footprints reprojected into the target CRS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDerivation {
    /// CRS identifier, e.g. "EPSG:4326".
    pub crs: String,
    pub bbox: Option<BoundingBox>,
    /// (rows, cols)
    pub shape: Option<(usize, usize)>,
    /// (pixel_width, pixel_height) in CRS units.
    pub resolution: Option<(f64, f64)>,
}

impl FrameSpec {
    /// Resolve this spec into a concrete frame.
    ///
    /// `candidates` are the discovered assets, used only when the bbox must
    /// be derived from footprints.
    pub fn build(&self, candidates: &[Asset]) -> CubeResult<ReferenceFrame> {
        match self {
            FrameSpec::Explicit(frame) => Ok(frame.clone()),
            FrameSpec::Derive(spec) => derive_frame(spec, candidates),
        }
    }
}

fn derive_frame(spec: &FrameDerivation, candidates: &[Asset]) -> CubeResult<ReferenceFrame> {
    let crs = CrsCode::parse(&spec.crs)?;

    if spec.shape.is_none() && spec.resolution.is_none() {
        return Err(CubeError::configuration(
            "frame derivation requires at least one of shape or resolution",
        ));
    }
    if let Some((rx, ry)) = spec.resolution {
        if rx <= 0.0 || ry <= 0.0 {
            return Err(CubeError::configuration(format!(
                "frame resolution must be positive, got ({rx}, {ry})"
            )));
        }
    }
    if let Some((rows, cols)) = spec.shape {
        if rows == 0 || cols == 0 {
            return Err(CubeError::configuration(format!(
                "frame shape must be positive, got {rows}x{cols}"
            )));
        }
    }

    let bbox = match spec.bbox {
        Some(bbox) => bbox,
        None => union_footprints(crs, candidates)?,
    };
    if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
        return Err(CubeError::configuration(format!(
            "derived frame bbox has no area: {bbox:?}"
        )));
    }

    // Resolution wins when both are supplied; shape is recomputed from it.
    let ((rows, cols), (res_x, res_y)) = match (spec.resolution, spec.shape) {
        (Some((rx, ry)), _) => {
            let cols = (bbox.width() / rx).ceil().max(1.0) as usize;
            let rows = (bbox.height() / ry).ceil().max(1.0) as usize;
            ((rows, cols), (rx, ry))
        }
        (None, Some((rows, cols))) => {
            let rx = bbox.width() / cols as f64;
            let ry = bbox.height() / rows as f64;
            ((rows, cols), (rx, ry))
        }
        (None, None) => unreachable!("checked above"),
    };

    // Anchor at the bbox minimum corner: the grid grows east from min_x and
    // the row origin sits at min_y + rows * res_y so row `rows-1` ends
    // exactly on min_y.
    let transform = GridTransform {
        origin_x: bbox.min_x,
        origin_y: bbox.min_y + rows as f64 * res_y,
        pixel_width: res_x,
        pixel_height: res_y,
    };

    ReferenceFrame::new(crs, transform, rows, cols)
}

/// Union of candidate footprints, reprojected into the target CRS.
fn union_footprints(crs: CrsCode, candidates: &[Asset]) -> CubeResult<BoundingBox> {
    let mut acc: Option<BoundingBox> = None;
    for asset in candidates {
        let bbox = asset.crs.transform_bbox(crs, &asset.footprint_bbox());
        acc = Some(match acc {
            Some(b) => b.union(&bbox),
            None => bbox,
        });
    }
    acc.ok_or_else(|| {
        CubeError::configuration("cannot derive frame bbox: no candidate assets and no bbox given")
    })
}
