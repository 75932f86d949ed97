//! Vector transformer: rasterize features onto the frame.
//!
//! Features burn in source order, so where two features of the same asset
//! overlap the later one wins. Attribute bands burn the feature's numeric
//! attribute value; the geometry-presence mask layer burns 1.0 wherever any
//! feature covers a cell.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cube_common::Geometry;
use tracing::debug;

use crate::asset::VectorData;
use crate::config::LoadConfig;
use crate::error::CubeResult;
use crate::filter::PlannedAsset;
use crate::frame::ReferenceFrame;

use super::{within_window, Contribution, PartialGrid};

/// Rasterize one vector asset's features onto the frame.
///
/// Emits one contribution per (band, time-slice) pair the features touch,
/// plus the mask layer per time-slice unless it is suppressed. Mask-only
/// assets contribute the mask layer and nothing else. Features whose
/// resolved timestamp falls outside the load window are dropped.
pub fn transform_vector(
    data: &VectorData,
    planned: &PlannedAsset,
    frame: &ReferenceFrame,
    config: &LoadConfig,
) -> CubeResult<Vec<Contribution>> {
    let asset = &planned.asset;
    let fallback = asset.extent.nominal();

    // (band, bucket) -> partial grid; BTreeMap keeps emission order stable.
    let mut grids: BTreeMap<(String, DateTime<Utc>), PartialGrid> = BTreeMap::new();

    for feature in &data.features {
        let ts = feature.timestamp.unwrap_or(fallback);
        if !within_window(ts, config.start_ts, config.end_ts) {
            continue;
        }
        let geometry = feature.geometry.transform(data.crs, frame.crs);
        let bucket = config.time_groupby.bucket(ts);

        let cells = covered_cells(&geometry, frame);
        if cells.is_empty() {
            continue;
        }

        if !planned.mask_only {
            for band in &planned.load_bands {
                let Some(&value) = feature.attributes.get(band) else {
                    continue;
                };
                let grid = grids
                    .entry((band.clone(), bucket))
                    .or_insert_with(|| PartialGrid::empty(frame.len()));
                for &index in &cells {
                    grid.set(index, value);
                }
            }
        }

        if let Some(mask_layer) = &config.mask_layer {
            let grid = grids
                .entry((mask_layer.clone(), bucket))
                .or_insert_with(|| PartialGrid::empty(frame.len()));
            for &index in &cells {
                grid.set(index, 1.0);
            }
        }
    }

    debug!(
        asset_id = %asset.id,
        features = data.features.len(),
        layers = grids.len(),
        "rasterized vector asset"
    );

    Ok(grids
        .into_iter()
        .map(|((band, bucket), grid)| Contribution { band, bucket, grid })
        .collect())
}

/// Flat indices of the frame cells a geometry covers.
///
/// Points burn the cell their coordinate falls in; polygons burn every cell
/// whose center lies inside, scanning only the rows and columns the polygon
/// bbox touches.
fn covered_cells(geometry: &Geometry, frame: &ReferenceFrame) -> Vec<usize> {
    match geometry {
        Geometry::Point { x, y } => frame
            .world_to_cell(*x, *y)
            .map(|(row, col)| vec![frame.flat_index(row, col)])
            .unwrap_or_default(),
        Geometry::MultiPoint(points) => {
            let mut cells: Vec<usize> = points
                .iter()
                .filter_map(|&(x, y)| frame.world_to_cell(x, y))
                .map(|(row, col)| frame.flat_index(row, col))
                .collect();
            cells.sort_unstable();
            cells.dedup();
            cells
        }
        Geometry::Polygon { .. } | Geometry::MultiPolygon(_) => {
            let Some(bbox) = geometry.bbox() else {
                return Vec::new();
            };
            // Clip the scan window to the frame
            let t = &frame.transform;
            let col_min = (((bbox.min_x - t.origin_x) / t.pixel_width).floor().max(0.0)) as usize;
            let row_min = (((t.origin_y - bbox.max_y) / t.pixel_height).floor().max(0.0)) as usize;
            let col_max = ((bbox.max_x - t.origin_x) / t.pixel_width).ceil();
            let row_max = ((t.origin_y - bbox.min_y) / t.pixel_height).ceil();
            if col_max <= 0.0 || row_max <= 0.0 {
                return Vec::new();
            }
            let col_max = (col_max as usize).min(frame.cols);
            let row_max = (row_max as usize).min(frame.rows);

            let mut cells = Vec::new();
            for row in row_min..row_max {
                for col in col_min..col_max {
                    let (x, y) = t.cell_center(row, col);
                    if geometry.contains_point(x, y) {
                        cells.push(frame.flat_index(row, col));
                    }
                }
            }
            cells
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cube_common::{BoundingBox, CrsCode, TemporalExtent, TimeGrouping};

    use crate::asset::{Asset, AssetKind, Feature};
    use crate::frame::{FrameSpec, GridTransform};

    fn frame_4x4() -> ReferenceFrame {
        ReferenceFrame::new(
            CrsCode::Epsg4326,
            GridTransform {
                origin_x: 0.0,
                origin_y: 4.0,
                pixel_width: 1.0,
                pixel_height: 1.0,
            },
            4,
            4,
        )
        .unwrap()
    }

    fn vector_asset(bands: &[&str]) -> Asset {
        Asset::new(
            "v",
            AssetKind::Vector,
            BoundingBox::new(0.0, 0.0, 4.0, 4.0),
            CrsCode::Epsg4326,
            TemporalExtent::Instant(Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap()),
            bands.iter().map(|b| b.to_string()),
            "mem://v",
        )
    }

    fn planned(asset: Asset, mask_only: bool) -> PlannedAsset {
        let load_bands = if mask_only {
            Default::default()
        } else {
            asset.bands.clone()
        };
        PlannedAsset {
            asset,
            load_bands,
            mask_only,
        }
    }

    fn config() -> LoadConfig {
        LoadConfig::new(FrameSpec::Explicit(frame_4x4()))
    }

    fn square(min: f64, max: f64) -> Geometry {
        Geometry::Polygon {
            exterior: vec![(min, min), (max, min), (max, max), (min, max)],
            holes: vec![],
        }
    }

    fn feature(geometry: Geometry, attrs: &[(&str, f64)]) -> Feature {
        Feature {
            geometry,
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            timestamp: None,
        }
    }

    #[test]
    fn test_polygon_burns_attribute_and_mask() {
        let data = VectorData {
            crs: CrsCode::Epsg4326,
            // Lower-left 2x2 block of the 4x4 frame
            features: vec![feature(square(0.0, 2.0), &[("yield", 7.0)])],
        };
        let out = transform_vector(
            &data,
            &planned(vector_asset(&["yield"]), false),
            &frame_4x4(),
            &config(),
        )
        .unwrap();

        assert_eq!(out.len(), 2);
        let mask = out.iter().find(|c| c.band == "mask").unwrap();
        let band = out.iter().find(|c| c.band == "yield").unwrap();
        // Rows 2..4, cols 0..2 covered
        for &index in &[8usize, 9, 12, 13] {
            assert_eq!(band.grid.values[index], 7.0);
            assert_eq!(mask.grid.values[index], 1.0);
        }
        assert_eq!(band.grid.valid_count(), 4);
        assert_eq!(mask.grid.valid_count(), 4);
    }

    #[test]
    fn test_draw_order_later_feature_wins() {
        let data = VectorData {
            crs: CrsCode::Epsg4326,
            features: vec![
                feature(square(0.0, 2.0), &[("yield", 1.0)]),
                feature(square(1.0, 3.0), &[("yield", 2.0)]),
            ],
        };
        let out = transform_vector(
            &data,
            &planned(vector_asset(&["yield"]), false),
            &frame_4x4(),
            &config(),
        )
        .unwrap();
        let band = out.iter().find(|c| c.band == "yield").unwrap();
        // Overlap cell (row 2, col 1) takes the later value
        assert_eq!(band.grid.values[9], 2.0);
        // Non-overlap cell of the first feature keeps its value
        assert_eq!(band.grid.values[12], 1.0);
    }

    #[test]
    fn test_mask_only_emits_mask_only() {
        let data = VectorData {
            crs: CrsCode::Epsg4326,
            features: vec![feature(square(0.0, 2.0), &[("soil_type", 3.0)])],
        };
        let out = transform_vector(
            &data,
            &planned(vector_asset(&["soil_type"]), true),
            &frame_4x4(),
            &config(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].band, "mask");
    }

    #[test]
    fn test_mask_layer_suppressed() {
        let mut cfg = config();
        cfg.mask_layer = None;
        let data = VectorData {
            crs: CrsCode::Epsg4326,
            features: vec![feature(square(0.0, 2.0), &[("yield", 7.0)])],
        };
        let out = transform_vector(
            &data,
            &planned(vector_asset(&["yield"]), false),
            &frame_4x4(),
            &cfg,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].band, "yield");
    }

    #[test]
    fn test_feature_timestamps_split_buckets() {
        let mut cfg = config();
        cfg.time_groupby = TimeGrouping::Year;

        let mut f1 = feature(square(0.0, 2.0), &[("yield", 1.0)]);
        f1.timestamp = Some(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap());
        let mut f2 = feature(square(2.0, 4.0), &[("yield", 2.0)]);
        f2.timestamp = Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());

        let data = VectorData {
            crs: CrsCode::Epsg4326,
            features: vec![f1, f2],
        };
        let out = transform_vector(
            &data,
            &planned(vector_asset(&["yield"]), false),
            &frame_4x4(),
            &cfg,
        )
        .unwrap();

        let buckets: Vec<DateTime<Utc>> = out
            .iter()
            .filter(|c| c.band == "yield")
            .map(|c| c.bucket)
            .collect();
        assert_eq!(
            buckets,
            vec![
                Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_out_of_window_features_dropped() {
        let mut cfg = config();
        cfg.time_groupby = TimeGrouping::Year;
        cfg.start_ts = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        cfg.end_ts = Some(Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap());

        // The asset extent overlaps the window; one feature does not
        let mut asset = vector_asset(&["yield"]);
        asset.extent = TemporalExtent::Interval {
            start: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap(),
        };

        let mut inside = feature(square(0.0, 2.0), &[("yield", 1.0)]);
        inside.timestamp = Some(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap());
        let mut stray = feature(square(2.0, 4.0), &[("yield", 2.0)]);
        stray.timestamp = Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());

        let data = VectorData {
            crs: CrsCode::Epsg4326,
            features: vec![inside, stray],
        };
        let out = transform_vector(&data, &planned(asset, false), &frame_4x4(), &cfg).unwrap();

        // Only the 2023 bucket exists, for the band and the mask alike
        assert!(out
            .iter()
            .all(|c| c.bucket == Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));
        let band = out.iter().find(|c| c.band == "yield").unwrap();
        assert_eq!(band.grid.valid_count(), 4);
        assert!(band.grid.values.iter().all(|&v| v.is_nan() || v == 1.0));
    }

    #[test]
    fn test_point_feature_burns_single_cell() {
        let data = VectorData {
            crs: CrsCode::Epsg4326,
            features: vec![feature(Geometry::Point { x: 2.5, y: 1.5 }, &[("v", 9.0)])],
        };
        let out = transform_vector(
            &data,
            &planned(vector_asset(&["v"]), false),
            &frame_4x4(),
            &config(),
        )
        .unwrap();
        let band = out.iter().find(|c| c.band == "v").unwrap();
        // (x=2.5, y=1.5) is row 2, col 2
        assert_eq!(band.grid.valid_count(), 1);
        assert_eq!(band.grid.values[10], 9.0);
    }

    #[test]
    fn test_feature_outside_frame_ignored() {
        let data = VectorData {
            crs: CrsCode::Epsg4326,
            features: vec![feature(square(10.0, 12.0), &[("v", 1.0)])],
        };
        let out = transform_vector(
            &data,
            &planned(vector_asset(&["v"]), false),
            &frame_4x4(),
            &config(),
        )
        .unwrap();
        assert!(out.is_empty());
    }
}
