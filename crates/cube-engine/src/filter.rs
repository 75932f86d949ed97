//! Asset filters: decide which discovered assets participate in a build.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use cube_common::SpatialRelation;
use tracing::debug;

use crate::asset::{Asset, AssetKind};
use crate::frame::ReferenceFrame;

/// An asset that survived filtering, annotated with the bands to load.
#[derive(Debug, Clone)]
pub struct PlannedAsset {
    pub asset: Asset,
    /// Declared band names to load (canonical, aliases resolved).
    pub load_bands: BTreeSet<String>,
    /// Vector asset admitted for its geometry mask only.
    pub mask_only: bool,
}

/// Keep assets whose footprint is not disjoint from the frame extent.
///
/// Footprints are reprojected into the frame CRS before classification.
pub fn spatial_filter(assets: Vec<Asset>, frame: &ReferenceFrame) -> Vec<Asset> {
    let frame_bbox = frame.bbox();
    assets
        .into_iter()
        .filter(|asset| {
            let footprint = asset.crs.transform_bbox(frame.crs, &asset.footprint_bbox());
            let relation = frame_bbox.relation_to(&footprint);
            if relation == SpatialRelation::Disjoint {
                debug!(asset_id = %asset.id, "asset outside frame extent, dropped");
                false
            } else {
                true
            }
        })
        .collect()
}

/// Keep assets whose temporal extent intersects the inclusive [start, end].
///
/// Absent bounds are unbounded; partial interval overlap is sufficient.
pub fn temporal_filter(
    assets: Vec<Asset>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<Asset> {
    assets
        .into_iter()
        .filter(|asset| {
            let keep = asset.extent.intersects(start, end);
            if !keep {
                debug!(asset_id = %asset.id, "asset outside temporal bounds, dropped");
            }
            keep
        })
        .collect()
}

/// Keep assets that declare at least one requested band.
///
/// An empty request means "all bands". Raster aliases satisfy the request
/// and resolve to their canonical band name. With `use_all_vectors`, vector
/// assets without a band match are still admitted for their geometry mask
/// layer (but contribute no attribute bands).
pub fn band_filter(
    assets: Vec<Asset>,
    requested: &BTreeSet<String>,
    use_all_vectors: bool,
) -> Vec<PlannedAsset> {
    assets
        .into_iter()
        .filter_map(|asset| {
            let load_bands: BTreeSet<String> = if requested.is_empty() {
                asset.bands.iter().cloned().collect()
            } else {
                let mut matched: BTreeSet<String> = requested
                    .iter()
                    .filter(|band| asset.bands.contains(*band))
                    .cloned()
                    .collect();
                // Alias hits load under their canonical name
                for (alias, canonical) in &asset.aliases {
                    if requested.contains(alias) {
                        matched.insert(canonical.clone());
                    }
                }
                matched
            };

            let mask_only = load_bands.is_empty();
            if mask_only && !(asset.kind == AssetKind::Vector && use_all_vectors) {
                // Vector assets with no declared bands are inherently
                // mask-only and pass when nothing was requested.
                if !(asset.kind == AssetKind::Vector && requested.is_empty()) {
                    debug!(asset_id = %asset.id, "no band overlap, dropped");
                    return None;
                }
            }

            Some(PlannedAsset {
                asset,
                load_bands,
                mask_only,
            })
        })
        .collect()
}
