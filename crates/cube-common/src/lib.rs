//! Common geospatial primitives shared across the geocube workspace.

pub mod bbox;
pub mod crs;
pub mod dtype;
pub mod geometry;
pub mod time;

pub use bbox::{BoundingBox, SpatialRelation};
pub use crs::{CrsCode, CrsParseError};
pub use dtype::{cast_values, CastError, DataArray, DataType};
pub use geometry::Geometry;
pub use time::{parse_iso8601, TemporalExtent, TimeGrouping, TimeParseError};
