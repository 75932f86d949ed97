//! The merge engine: accumulates partial grids per (band, time-slice) key.
//!
//! Contributions must be pushed in stable order (assets sorted by id, then
//! each asset's contributions in emitted order) so that the order-sensitive
//! `replace` strategy is reproducible regardless of discovery order.
//! No-data is a pure placeholder: an invalid incoming cell never displaces
//! an existing valid value and never participates in arithmetic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BandPolicy;
use crate::transform::{Contribution, PartialGrid};

/// Numeric reduction applied when multiple contributions target a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Last valid contribution wins.
    #[default]
    Replace,
    Min,
    Max,
    Mean,
    Sum,
}

impl MergeStrategy {
    /// Parse from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "replace" => Some(Self::Replace),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "mean" => Some(Self::Mean),
            "sum" => Some(Self::Sum),
            _ => None,
        }
    }

    /// Whether the final value is invariant to contribution order.
    pub fn is_commutative(&self) -> bool {
        !matches!(self, Self::Replace)
    }
}

/// Identifies one output layer slice: a band at a time bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SliceKey {
    pub band: String,
    pub bucket: DateTime<Utc>,
}

/// Per-key merge state, alive for a single cube build.
#[derive(Debug, Clone)]
pub struct Accumulator {
    strategy: MergeStrategy,
    /// Running value per cell; running sum for `mean`.
    values: Vec<f64>,
    valid: Vec<bool>,
    /// Contribution count per cell; only maintained for `mean`.
    counts: Vec<u32>,
}

impl Accumulator {
    fn new(len: usize, strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            values: vec![f64::NAN; len],
            valid: vec![false; len],
            counts: if strategy == MergeStrategy::Mean {
                vec![0; len]
            } else {
                Vec::new()
            },
        }
    }

    /// Apply one partial grid cell-wise.
    fn apply(&mut self, grid: &PartialGrid) {
        debug_assert_eq!(grid.values.len(), self.values.len());
        for i in 0..self.values.len() {
            if !grid.valid[i] || grid.values[i].is_nan() {
                continue;
            }
            let incoming = grid.values[i];
            if !self.valid[i] {
                self.values[i] = incoming;
                self.valid[i] = true;
                if self.strategy == MergeStrategy::Mean {
                    self.counts[i] = 1;
                }
                continue;
            }
            match self.strategy {
                MergeStrategy::Replace => self.values[i] = incoming,
                MergeStrategy::Min => self.values[i] = self.values[i].min(incoming),
                MergeStrategy::Max => self.values[i] = self.values[i].max(incoming),
                MergeStrategy::Sum => self.values[i] += incoming,
                MergeStrategy::Mean => {
                    self.values[i] += incoming;
                    self.counts[i] += 1;
                }
            }
        }
    }

    /// Finalize into per-cell values; cells without any valid contribution
    /// are NaN.
    pub fn finalize(self) -> Vec<f64> {
        match self.strategy {
            MergeStrategy::Mean => self
                .values
                .into_iter()
                .zip(self.counts)
                .map(|(sum, count)| if count > 0 { sum / count as f64 } else { f64::NAN })
                .collect(),
            _ => self
                .values
                .into_iter()
                .zip(self.valid)
                .map(|(v, ok)| if ok { v } else { f64::NAN })
                .collect(),
        }
    }
}

/// Accumulates contributions from all assets of one cube build.
///
/// The accumulator arena is keyed by sorted [`SliceKey`]s and consumed
/// wholesale by the assembler.
pub struct MergeEngine {
    cell_count: usize,
    policy: BandPolicy<MergeStrategy>,
    accumulators: BTreeMap<SliceKey, Accumulator>,
}

impl MergeEngine {
    pub fn new(cell_count: usize, policy: BandPolicy<MergeStrategy>) -> Self {
        Self {
            cell_count,
            policy,
            accumulators: BTreeMap::new(),
        }
    }

    /// Resolved strategy for a band (policy lookup, else fallback).
    pub fn strategy_for(&self, band: &str) -> MergeStrategy {
        *self.policy.resolve(band)
    }

    /// Apply one contribution to its accumulator, creating it on first use.
    pub fn push(&mut self, contribution: &Contribution) {
        let key = SliceKey {
            band: contribution.band.clone(),
            bucket: contribution.bucket,
        };
        let strategy = self.strategy_for(&contribution.band);
        let acc = self
            .accumulators
            .entry(key)
            .or_insert_with(|| Accumulator::new(self.cell_count, strategy));
        acc.apply(&contribution.grid);
    }

    /// Consume the engine, yielding finalized accumulators in key order.
    pub fn into_accumulators(self) -> BTreeMap<SliceKey, Accumulator> {
        self.accumulators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn grid(values: Vec<f64>) -> PartialGrid {
        let valid = values.iter().map(|v| !v.is_nan()).collect();
        PartialGrid { values, valid }
    }

    fn contribution(band: &str, values: Vec<f64>) -> Contribution {
        Contribution {
            band: band.to_string(),
            bucket: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            grid: grid(values),
        }
    }

    fn engine(strategy: MergeStrategy) -> MergeEngine {
        MergeEngine::new(4, BandPolicy::uniform(strategy))
    }

    fn finalize_single(engine: MergeEngine) -> Vec<f64> {
        let accs = engine.into_accumulators();
        assert_eq!(accs.len(), 1);
        accs.into_values().next().unwrap().finalize()
    }

    #[test]
    fn test_max_merge_scenario() {
        // Three 2x2 contributions; max merge
        let mut eng = engine(MergeStrategy::Max);
        eng.push(&contribution("red", vec![1.0, 2.0, 3.0, 4.0]));
        eng.push(&contribution("red", vec![5.0, 0.0, 1.0, 9.0]));
        eng.push(&contribution("red", vec![2.0, 2.0, 2.0, 2.0]));
        assert_eq!(finalize_single(eng), vec![5.0, 2.0, 3.0, 9.0]);
    }

    #[test]
    fn test_mean_merge() {
        let mut eng = engine(MergeStrategy::Mean);
        eng.push(&contribution("b", vec![10.0, f64::NAN, 1.0, 0.0]));
        eng.push(&contribution("b", vec![20.0, 4.0, f64::NAN, 2.0]));
        let out = finalize_single(eng);
        assert_eq!(out[0], 15.0);
        assert_eq!(out[1], 4.0);
        assert_eq!(out[2], 1.0);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_replace_last_wins() {
        let mut eng = engine(MergeStrategy::Replace);
        eng.push(&contribution("b", vec![1.0, 1.0, 1.0, 1.0]));
        eng.push(&contribution("b", vec![2.0, f64::NAN, 2.0, 2.0]));
        let out = finalize_single(eng);
        // Nodata never overwrites an existing valid value
        assert_eq!(out, vec![2.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_nodata_never_bids() {
        let mut eng = engine(MergeStrategy::Sum);
        eng.push(&contribution("b", vec![1.0, f64::NAN, f64::NAN, 3.0]));
        eng.push(&contribution("b", vec![f64::NAN, f64::NAN, 2.0, 3.0]));
        let out = finalize_single(eng);
        assert_eq!(out[0], 1.0);
        assert!(out[1].is_nan());
        // An existing no-data cell is replaced by a later valid value
        assert_eq!(out[2], 2.0);
        assert_eq!(out[3], 6.0);
    }

    #[test]
    fn test_commutative_order_invariance() {
        let a = vec![1.0, f64::NAN, 5.0, 2.0];
        let b = vec![4.0, 3.0, f64::NAN, 2.0];
        let c = vec![0.0, 7.0, 1.0, f64::NAN];

        for strategy in [
            MergeStrategy::Min,
            MergeStrategy::Max,
            MergeStrategy::Sum,
            MergeStrategy::Mean,
        ] {
            let mut forward = engine(strategy);
            for values in [&a, &b, &c] {
                forward.push(&contribution("b", values.clone()));
            }
            let mut backward = engine(strategy);
            for values in [&c, &b, &a] {
                backward.push(&contribution("b", values.clone()));
            }
            assert_eq!(
                finalize_single(forward),
                finalize_single(backward),
                "{strategy:?} should be order invariant"
            );
        }
    }

    #[test]
    fn test_per_band_policy() {
        let policy = BandPolicy::new(
            [("elevation".to_string(), MergeStrategy::Max)].into(),
            MergeStrategy::Replace,
        );
        let eng = MergeEngine::new(1, policy);
        assert_eq!(eng.strategy_for("elevation"), MergeStrategy::Max);
        assert_eq!(eng.strategy_for("other"), MergeStrategy::Replace);
    }
}
