//! Cube assembly: turn finalized accumulators into labeled output arrays.
//!
//! The time axis is the sorted set of distinct buckets any band touched, so
//! all bands share one axis. Cells no asset covered, and whole slices a band
//! skipped, are filled with the band's nodata value before casting to the
//! band's output type.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use cube_common::{cast_values, DataArray, DataType};
use tracing::debug;

use crate::config::BandPolicy;
use crate::error::{CubeError, CubeResult};
use crate::frame::ReferenceFrame;
use crate::merge::{Accumulator, SliceKey};

/// One output band: a (time, row, col) array in its configured type.
#[derive(Debug, Clone)]
pub struct BandLayer {
    pub data: DataArray,
    pub dtype: DataType,
    /// Fill value for cells without data; meaningless for the reader when
    /// the dtype is float and nodata is NaN.
    pub nodata: f64,
    /// (times, rows, cols)
    pub shape: (usize, usize, usize),
}

impl BandLayer {
    /// Read one cell back as f64.
    pub fn value(&self, time: usize, row: usize, col: usize) -> Option<f64> {
        let (nt, rows, cols) = self.shape;
        if time >= nt || row >= rows || col >= cols {
            return None;
        }
        self.data.get((time * rows + row) * cols + col)
    }
}

/// The assembled data cube.
#[derive(Debug, Clone)]
pub struct Cube {
    pub frame: ReferenceFrame,
    /// Time axis labels, ascending; shared by every band.
    pub times: Vec<DateTime<Utc>>,
    pub bands: BTreeMap<String, BandLayer>,
}

impl Cube {
    /// Look up a band layer by name.
    pub fn band(&self, name: &str) -> Option<&BandLayer> {
        self.bands.get(name)
    }

    /// Index of a time label on the shared axis.
    pub fn time_index(&self, time: DateTime<Utc>) -> Option<usize> {
        self.times.iter().position(|&t| t == time)
    }
}

/// Assemble finalized accumulators into a cube.
pub fn assemble(
    frame: ReferenceFrame,
    accumulators: BTreeMap<SliceKey, Accumulator>,
    nodata: &BandPolicy<f64>,
    dtype: &BandPolicy<DataType>,
    strict_cast: bool,
) -> CubeResult<Cube> {
    let cells = frame.len();

    let times: Vec<DateTime<Utc>> = accumulators
        .keys()
        .map(|key| key.bucket)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // band -> bucket -> finalized values
    let mut per_band: BTreeMap<String, BTreeMap<DateTime<Utc>, Vec<f64>>> = BTreeMap::new();
    for (key, acc) in accumulators {
        per_band
            .entry(key.band)
            .or_default()
            .insert(key.bucket, acc.finalize());
    }

    let mut bands = BTreeMap::new();
    for (band, slices) in per_band {
        let fill = *nodata.resolve(&band);
        let target = *dtype.resolve(&band);

        let mut values = Vec::with_capacity(times.len() * cells);
        for time in &times {
            match slices.get(time) {
                Some(slice) => values.extend(
                    slice
                        .iter()
                        .map(|&v| if v.is_nan() { fill } else { v }),
                ),
                None => values.extend(std::iter::repeat(fill).take(cells)),
            }
        }

        let data = cast_values(&values, target, fill, strict_cast).map_err(|source| {
            CubeError::Cast {
                band: band.clone(),
                source,
            }
        })?;

        debug!(band = %band, dtype = %target, slices = slices.len(), "assembled band");
        bands.insert(
            band,
            BandLayer {
                data,
                dtype: target,
                nodata: fill,
                shape: (times.len(), frame.rows, frame.cols),
            },
        );
    }

    Ok(Cube {
        frame,
        times,
        bands,
    })
}
