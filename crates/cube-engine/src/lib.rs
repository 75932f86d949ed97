//! Spatiotemporal data cube assembly.
//!
//! Takes a set of discovered geospatial assets (rasters, vector features,
//! point observations) plus a load configuration and produces a labeled
//! data cube: per-band (time, row, col) arrays aligned to one reference
//! frame, with deterministic conflict resolution wherever assets overlap.
//!
//! The pipeline, in order:
//!
//! 1. Resolve the [`frame::ReferenceFrame`] from the config (explicit or
//!    derived from asset footprints).
//! 2. Filter candidates spatially, temporally and by band ([`filter`]).
//! 3. Transform each surviving asset into frame-aligned partial grids
//!    ([`transform`]), fetching native data through the [`asset::AssetReader`]
//!    collaborator.
//! 4. Merge overlapping contributions per band and time-slice ([`merge`]).
//! 5. Assemble, fill and cast the output arrays ([`assemble`]).
//!
//! [`loader::CubeLoader`] drives the whole pipeline.

pub mod assemble;
pub mod asset;
pub mod config;
pub mod error;
pub mod filter;
pub mod frame;
pub mod loader;
pub mod merge;
pub mod transform;

pub use assemble::{BandLayer, Cube};
pub use asset::{Asset, AssetKind, AssetReader};
pub use config::{BandPolicy, ErrorMode, LoadConfig, DEFAULT_MASK_LAYER};
pub use error::{CubeError, CubeResult};
pub use frame::{FrameDerivation, FrameSpec, GridTransform, ReferenceFrame};
pub use loader::{CubeLoadResult, CubeLoader, SkippedAsset};
pub use merge::MergeStrategy;
pub use transform::Resampling;
