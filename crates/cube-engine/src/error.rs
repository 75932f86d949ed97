//! Error types for cube assembly.

use cube_common::CastError;
use thiserror::Error;

/// Result type alias for cube operations.
pub type CubeResult<T> = Result<T, CubeError>;

/// Errors that can occur while building a cube.
///
/// Propagation policy:
/// - `Configuration` always aborts the build (the frame is foundational).
/// - `AssetLoad` and `Transform` abort in strict mode; in lenient mode the
///   affected asset is skipped and recorded.
/// - `Cast` is always fatal for the affected band's final assembly.
#[derive(Debug, Error)]
pub enum CubeError {
    /// Unresolvable frame spec or invalid load configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The I/O collaborator failed to retrieve an asset's native data.
    #[error("failed to load asset '{asset_id}': {message}")]
    AssetLoad { asset_id: String, message: String },

    /// Resampling, rasterization or binning failed for an asset.
    #[error("failed to transform asset '{asset_id}': {message}")]
    Transform { asset_id: String, message: String },

    /// The output data-type cast would lose required precision.
    #[error("cast failed for band '{band}': {source}")]
    Cast {
        band: String,
        #[source]
        source: CastError,
    },
}

impl CubeError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an AssetLoad error.
    pub fn asset_load(asset_id: impl Into<String>, msg: impl ToString) -> Self {
        Self::AssetLoad {
            asset_id: asset_id.into(),
            message: msg.to_string(),
        }
    }

    /// Create a Transform error.
    pub fn transform(asset_id: impl Into<String>, msg: impl ToString) -> Self {
        Self::Transform {
            asset_id: asset_id.into(),
            message: msg.to_string(),
        }
    }

    /// Whether this error may be skipped in lenient mode.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::AssetLoad { .. } | Self::Transform { .. })
    }
}

impl From<cube_common::CrsParseError> for CubeError {
    fn from(err: cube_common::CrsParseError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<cube_common::TimeParseError> for CubeError {
    fn from(err: cube_common::TimeParseError) -> Self {
        Self::Configuration(err.to_string())
    }
}
