//! Raster transformer: resample a source grid onto the frame's pixel grid.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::asset::RasterData;
use crate::error::{CubeError, CubeResult};
use crate::filter::PlannedAsset;
use crate::frame::ReferenceFrame;

use super::{sample, Contribution, PartialGrid, Resampling};

/// Resample every loaded band of one raster asset onto the frame.
///
/// Each output cell center is mapped through the frame affine into the
/// frame CRS, reprojected into the source CRS and sampled at fractional
/// source pixel coordinates. Cells outside the source extent, and cells
/// that hit source nodata, are marked invalid.
pub fn transform_raster(
    data: &RasterData,
    planned: &PlannedAsset,
    frame: &ReferenceFrame,
    bucket: DateTime<Utc>,
    method: Resampling,
) -> CubeResult<Vec<Contribution>> {
    let asset = &planned.asset;
    let grid = &data.grid;

    if grid.width == 0 || grid.height == 0 {
        return Err(CubeError::transform(&asset.id, "source grid is empty"));
    }

    let mut contributions = Vec::new();
    for band in &data.bands {
        if !planned.load_bands.contains(&band.name) {
            continue;
        }
        if band.data.len() != grid.width * grid.height {
            return Err(CubeError::transform(
                &asset.id,
                format!(
                    "band '{}' has {} values for a {}x{} grid",
                    band.name,
                    band.data.len(),
                    grid.width,
                    grid.height
                ),
            ));
        }

        // Normalize the source nodata sentinel to NaN so the sampling
        // kernels treat it as invalid.
        let source: Vec<f64> = match band.nodata {
            Some(nodata) => band
                .data
                .iter()
                .map(|&v| if v == nodata { f64::NAN } else { v })
                .collect(),
            None => band.data.clone(),
        };

        let mut partial = PartialGrid::empty(frame.len());
        for row in 0..frame.rows {
            for col in 0..frame.cols {
                let (wx, wy) = frame.transform.cell_center(row, col);
                let (sx, sy) = frame.crs.transform_point(grid.crs, wx, wy);
                let (px, py) = grid.fractional_cell(sx, sy);
                let value = sample(&source, grid.width, grid.height, px, py, method);
                if !value.is_nan() {
                    partial.set(frame.flat_index(row, col), value);
                }
            }
        }

        debug!(
            asset_id = %asset.id,
            band = %band.name,
            valid_cells = partial.valid_count(),
            "resampled raster band"
        );
        contributions.push(Contribution {
            band: band.name.clone(),
            bucket,
            grid: partial,
        });
    }

    Ok(contributions)
}
