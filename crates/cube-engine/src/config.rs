//! Load configuration: the options recognized by one cube build.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use cube_common::{DataType, TimeGrouping};
use serde::{Deserialize, Serialize};

use crate::frame::FrameSpec;
use crate::merge::MergeStrategy;
use crate::transform::Resampling;

/// Default name of the vector geometry-presence layer.
pub const DEFAULT_MASK_LAYER: &str = "mask";

/// A per-band mapping with a fallback for unmapped bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandPolicy<T> {
    per_band: HashMap<String, T>,
    fallback: T,
}

impl<T> BandPolicy<T> {
    pub fn new(per_band: HashMap<String, T>, fallback: T) -> Self {
        Self { per_band, fallback }
    }

    /// A policy that applies the same value to every band.
    pub fn uniform(fallback: T) -> Self {
        Self {
            per_band: HashMap::new(),
            fallback,
        }
    }

    /// Resolve the value for a band: mapped entry, else fallback.
    pub fn resolve(&self, band: &str) -> &T {
        self.per_band.get(band).unwrap_or(&self.fallback)
    }

    /// Override the value for one band.
    pub fn set(&mut self, band: impl Into<String>, value: T) {
        self.per_band.insert(band.into(), value);
    }
}

impl<T: Default> Default for BandPolicy<T> {
    fn default() -> Self {
        Self::uniform(T::default())
    }
}

/// What to do when an individual asset fails to load or transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Any asset failure aborts the whole build; no partial cube.
    #[default]
    Strict,
    /// Failing assets are skipped and recorded; the build continues.
    Lenient,
}

/// Full configuration surface for one cube build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Reference frame: prebuilt, or derived from crs/bbox/shape/resolution.
    pub frame: FrameSpec,

    /// Inclusive temporal bounds; `None` leaves that side unbounded.
    pub start_ts: Option<DateTime<Utc>>,
    pub end_ts: Option<DateTime<Utc>>,

    /// Requested band names; empty means all declared bands.
    pub bands: BTreeSet<String>,
    /// Admit vector assets with no matching bands for their geometry mask.
    pub use_all_vectors: bool,

    /// Time-slice bucketing granularity.
    pub time_groupby: TimeGrouping,

    /// Per-band merge strategy and fallback.
    pub merge: BandPolicy<MergeStrategy>,
    /// Per-band output fill value and fallback.
    pub nodata: BandPolicy<f64>,
    /// Per-band output data type and fallback.
    pub dtype: BandPolicy<DataType>,

    /// Raster resampling method (nearest is the categorical-safe default).
    pub resampling: Resampling,
    /// Name of the vector geometry-presence layer; `None` suppresses it.
    pub mask_layer: Option<String>,

    /// Fail on lossy output casts instead of rounding/saturating.
    pub strict_cast: bool,
    /// Per-asset failure handling.
    pub error_mode: ErrorMode,
}

impl LoadConfig {
    /// A config with defaults for everything but the frame.
    pub fn new(frame: FrameSpec) -> Self {
        Self {
            frame,
            start_ts: None,
            end_ts: None,
            bands: BTreeSet::new(),
            use_all_vectors: false,
            time_groupby: TimeGrouping::None,
            merge: BandPolicy::uniform(MergeStrategy::Replace),
            nodata: BandPolicy::uniform(f64::NAN),
            dtype: BandPolicy::uniform(DataType::F64),
            resampling: Resampling::Nearest,
            mask_layer: Some(DEFAULT_MASK_LAYER.to_string()),
            strict_cast: false,
            error_mode: ErrorMode::Strict,
        }
    }
}
