//! Point transformer: bin observations into frame cells.
//!
//! Several observations of one asset often land in the same cell. They are
//! pre-reduced here with the band's own merge strategy so the cross-asset
//! merge sees one value per cell, with `replace` keeping the last
//! observation in source order.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::asset::PointData;
use crate::config::LoadConfig;
use crate::error::CubeResult;
use crate::filter::PlannedAsset;
use crate::frame::ReferenceFrame;
use crate::merge::MergeStrategy;

use super::{within_window, Contribution, PartialGrid};

/// Per-(band, bucket) binning state.
struct CellBins {
    strategy: MergeStrategy,
    grid: PartialGrid,
    /// Observation count per cell; only maintained for `mean`.
    counts: Vec<u32>,
}

impl CellBins {
    fn new(len: usize, strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            grid: PartialGrid::empty(len),
            counts: if strategy == MergeStrategy::Mean {
                vec![0; len]
            } else {
                Vec::new()
            },
        }
    }

    fn add(&mut self, index: usize, value: f64) {
        if value.is_nan() {
            return;
        }
        if !self.grid.valid[index] {
            self.grid.set(index, value);
            if self.strategy == MergeStrategy::Mean {
                self.counts[index] = 1;
            }
            return;
        }
        let current = self.grid.values[index];
        match self.strategy {
            MergeStrategy::Replace => self.grid.values[index] = value,
            MergeStrategy::Min => self.grid.values[index] = current.min(value),
            MergeStrategy::Max => self.grid.values[index] = current.max(value),
            MergeStrategy::Sum => self.grid.values[index] = current + value,
            MergeStrategy::Mean => {
                self.grid.values[index] = current + value;
                self.counts[index] += 1;
            }
        }
    }

    fn finish(mut self) -> PartialGrid {
        if self.strategy == MergeStrategy::Mean {
            for (i, count) in self.counts.iter().enumerate() {
                if *count > 0 {
                    self.grid.values[i] /= *count as f64;
                }
            }
        }
        self.grid
    }
}

/// Bin one point asset's observations onto the frame.
///
/// Observations outside the frame, or whose resolved timestamp falls
/// outside the load window, are dropped silently; co-located values of one
/// band are reduced with that band's merge strategy.
pub fn transform_points(
    data: &PointData,
    planned: &PlannedAsset,
    frame: &ReferenceFrame,
    config: &LoadConfig,
) -> CubeResult<Vec<Contribution>> {
    let asset = &planned.asset;
    let fallback = asset.extent.nominal();

    let mut bins: BTreeMap<(String, DateTime<Utc>), CellBins> = BTreeMap::new();
    let mut outside = 0usize;

    for obs in &data.observations {
        let ts = obs.timestamp.unwrap_or(fallback);
        if !within_window(ts, config.start_ts, config.end_ts) {
            outside += 1;
            continue;
        }
        let (x, y) = data.crs.transform_point(frame.crs, obs.x, obs.y);
        let Some((row, col)) = frame.world_to_cell(x, y) else {
            outside += 1;
            continue;
        };
        let index = frame.flat_index(row, col);
        let bucket = config.time_groupby.bucket(ts);

        for band in &planned.load_bands {
            let Some(&value) = obs.values.get(band) else {
                continue;
            };
            bins.entry((band.clone(), bucket))
                .or_insert_with(|| {
                    CellBins::new(frame.len(), *config.merge.resolve(band))
                })
                .add(index, value);
        }
    }

    debug!(
        asset_id = %asset.id,
        observations = data.observations.len(),
        outside,
        layers = bins.len(),
        "binned point asset"
    );

    Ok(bins
        .into_iter()
        .map(|((band, bucket), cells)| Contribution {
            band,
            bucket,
            grid: cells.finish(),
        })
        .collect())
}
