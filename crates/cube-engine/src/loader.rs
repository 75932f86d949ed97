//! The cube loader: the end-to-end pipeline for one build.
//!
//! Filtering and transformation are deterministic: surviving assets are
//! sorted by id before the parallel transform stage, and contributions are
//! merged sequentially in that order, so the same inputs always produce the
//! same cube no matter how discovery ordered them.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::assemble::{assemble, Cube};
use crate::asset::{Asset, AssetReader};
use crate::config::{ErrorMode, LoadConfig};
use crate::error::CubeResult;
use crate::filter::{band_filter, spatial_filter, temporal_filter};
use crate::merge::MergeEngine;
use crate::transform::{transform_asset, Contribution};

/// Record of an asset skipped in lenient mode.
#[derive(Debug, Clone)]
pub struct SkippedAsset {
    pub asset_id: String,
    pub reason: String,
}

/// A finished build: the cube plus any assets skipped along the way.
///
/// `skipped` is always empty in strict mode.
#[derive(Debug)]
pub struct CubeLoadResult {
    pub cube: Cube,
    pub skipped: Vec<SkippedAsset>,
}

/// Drives a full cube build from discovered assets.
pub struct CubeLoader {
    reader: Arc<dyn AssetReader>,
    config: LoadConfig,
}

impl CubeLoader {
    pub fn new(reader: Arc<dyn AssetReader>, config: LoadConfig) -> Self {
        Self { reader, config }
    }

    /// Build a cube from the given candidate assets.
    ///
    /// Resolves the frame, filters the candidates spatially, temporally and
    /// by band, transforms the survivors in parallel, merges their
    /// contributions in stable order and assembles the output arrays.
    pub fn load(&self, assets: &[Asset]) -> CubeResult<CubeLoadResult> {
        let frame = self.config.frame.build(assets)?;
        info!(
            rows = frame.rows,
            cols = frame.cols,
            crs = ?frame.crs,
            candidates = assets.len(),
            "starting cube build"
        );

        let kept = spatial_filter(assets.to_vec(), &frame);
        let kept = temporal_filter(kept, self.config.start_ts, self.config.end_ts);
        let mut planned = band_filter(kept, &self.config.bands, self.config.use_all_vectors);

        // Merge order is defined by asset id, not discovery order
        planned.sort_by(|a, b| a.asset.id.cmp(&b.asset.id));
        debug!(planned = planned.len(), "assets selected for transform");

        let results: Vec<(String, CubeResult<Vec<Contribution>>)> = planned
            .par_iter()
            .map(|p| {
                let outcome = transform_asset(self.reader.as_ref(), p, &frame, &self.config);
                (p.asset.id.clone(), outcome)
            })
            .collect();

        let mut engine = MergeEngine::new(frame.len(), self.config.merge.clone());
        let mut skipped = Vec::new();
        for (asset_id, outcome) in results {
            match outcome {
                Ok(contributions) => {
                    for contribution in &contributions {
                        engine.push(contribution);
                    }
                }
                Err(err) if self.config.error_mode == ErrorMode::Lenient
                    && err.is_skippable() =>
                {
                    warn!(asset_id = %asset_id, error = %err, "skipping failed asset");
                    skipped.push(SkippedAsset {
                        asset_id,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let cube = assemble(
            frame,
            engine.into_accumulators(),
            &self.config.nodata,
            &self.config.dtype,
            self.config.strict_cast,
        )?;

        info!(
            bands = cube.bands.len(),
            times = cube.times.len(),
            skipped = skipped.len(),
            "cube build finished"
        );
        Ok(CubeLoadResult { cube, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CubeError;
    use chrono::{TimeZone, Utc};
    use cube_common::{BoundingBox, CrsCode, TemporalExtent};

    use crate::asset::{AssetKind, PointData, RasterData, VectorData};
    use crate::frame::{FrameSpec, GridTransform, ReferenceFrame};

    /// Reader that fails every request; exercises error-mode handling.
    struct FailingReader;

    impl AssetReader for FailingReader {
        fn read_raster(&self, asset: &Asset) -> anyhow::Result<RasterData> {
            anyhow::bail!("no such source: {}", asset.source)
        }
        fn read_vector(&self, asset: &Asset) -> anyhow::Result<VectorData> {
            anyhow::bail!("no such source: {}", asset.source)
        }
        fn read_points(&self, asset: &Asset) -> anyhow::Result<PointData> {
            anyhow::bail!("no such source: {}", asset.source)
        }
    }

    fn frame() -> ReferenceFrame {
        ReferenceFrame::new(
            CrsCode::Epsg4326,
            GridTransform {
                origin_x: 0.0,
                origin_y: 2.0,
                pixel_width: 1.0,
                pixel_height: 1.0,
            },
            2,
            2,
        )
        .unwrap()
    }

    fn asset(id: &str) -> Asset {
        Asset::new(
            id,
            AssetKind::Raster,
            BoundingBox::new(0.0, 0.0, 2.0, 2.0),
            CrsCode::Epsg4326,
            TemporalExtent::Instant(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
            vec!["b".to_string()],
            format!("mem://{id}"),
        )
    }

    #[test]
    fn test_strict_mode_aborts_on_read_failure() {
        let config = LoadConfig::new(FrameSpec::Explicit(frame()));
        let loader = CubeLoader::new(Arc::new(FailingReader), config);
        let err = loader.load(&[asset("a")]).unwrap_err();
        assert!(matches!(err, CubeError::AssetLoad { .. }));
    }

    #[test]
    fn test_lenient_mode_records_skips() {
        let mut config = LoadConfig::new(FrameSpec::Explicit(frame()));
        config.error_mode = ErrorMode::Lenient;
        let loader = CubeLoader::new(Arc::new(FailingReader), config);

        let result = loader.load(&[asset("a"), asset("b")]).unwrap();
        assert!(result.cube.bands.is_empty());
        assert_eq!(result.skipped.len(), 2);
        assert_eq!(result.skipped[0].asset_id, "a");
        assert!(result.skipped[0].reason.contains("mem://a"));
    }

    #[test]
    fn test_lenient_mode_does_not_mask_config_errors() {
        let mut config = LoadConfig::new(FrameSpec::Derive(crate::frame::FrameDerivation {
            crs: "EPSG:4326".to_string(),
            bbox: None,
            shape: None,
            resolution: Some((1.0, 1.0)),
        }));
        config.error_mode = ErrorMode::Lenient;
        let loader = CubeLoader::new(Arc::new(FailingReader), config);

        // No candidates and no bbox: frame derivation fails even in lenient
        let err = loader.load(&[]).unwrap_err();
        assert!(matches!(err, CubeError::Configuration(_)));
    }
}
