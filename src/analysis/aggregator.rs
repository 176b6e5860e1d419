//! Cross-run reduction of metric vectors to mean and standard error.
//!
//! Runs are grouped by a caller-chosen key. Every run folded under one key
//! must have the same vector length; each position is reduced independently.
//! Scalar metrics are vectors of length one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::formulas::round_to;
use super::types::PanLayout;

/// Decimal places kept for per-slot means
pub const MEAN_DECIMALS: i32 = 2;

/// Errors that can occur while folding runs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("Run vector has {found} entries but earlier runs under this key had {expected}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// Mean and standard error of one series entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint<K> {
    pub key: K,
    pub mean: Vec<f64>,
    /// Sample standard deviation over `sqrt(runs)`; 0 when only one run contributed
    pub std_error: Vec<f64>,
    pub runs: usize,
}

/// Reduced series, ordered by key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSeries<K> {
    pub points: Vec<SeriesPoint<K>>,
}

impl<K: Ord> AggregateSeries<K> {
    pub fn get(&self, key: &K) -> Option<&SeriesPoint<K>> {
        self.points
            .binary_search_by(|p| p.key.cmp(key))
            .ok()
            .map(|i| &self.points[i])
    }

    /// `(mean, std_error)` for a series built from scalar pushes
    pub fn scalar(&self, key: &K) -> Option<(f64, f64)> {
        let point = self.get(key)?;
        Some((*point.mean.first()?, *point.std_error.first()?))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.points.iter().map(|p| &p.key)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Accumulates run vectors per key
#[derive(Debug, Clone)]
pub struct SeriesAggregator<K> {
    mean_decimals: Option<i32>,
    groups: BTreeMap<K, Vec<Vec<f64>>>,
}

impl<K: Ord + Clone> SeriesAggregator<K> {
    /// Means are reported unrounded
    pub fn new() -> Self {
        Self {
            mean_decimals: None,
            groups: BTreeMap::new(),
        }
    }

    /// Means are rounded to `decimals` places; standard errors are not
    pub fn rounded(decimals: i32) -> Self {
        Self {
            mean_decimals: Some(decimals),
            groups: BTreeMap::new(),
        }
    }

    /// Whether a vector of `width` entries could be pushed under `key`
    pub fn check_width(&self, key: &K, width: usize) -> Result<(), AggregateError> {
        match self.groups.get(key).and_then(|rows| rows.first()) {
            Some(first) if first.len() != width => Err(AggregateError::ShapeMismatch {
                expected: first.len(),
                found: width,
            }),
            _ => Ok(()),
        }
    }

    /// Fold one run's vector under `key`
    pub fn push(&mut self, key: K, values: Vec<f64>) -> Result<(), AggregateError> {
        self.check_width(&key, values.len())?;
        self.groups.entry(key).or_default().push(values);
        Ok(())
    }

    pub fn push_scalar(&mut self, key: K, value: f64) -> Result<(), AggregateError> {
        self.push(key, vec![value])
    }

    /// Absorb every run held by `other`.
    ///
    /// Merging is order independent: the reduced result is the same whichever
    /// way partial aggregators are combined.
    pub fn merge(&mut self, other: Self) -> Result<(), AggregateError> {
        for (key, rows) in other.groups {
            for row in rows {
                self.push(key.clone(), row)?;
            }
        }
        Ok(())
    }

    pub fn run_count(&self, key: &K) -> usize {
        self.groups.get(key).map_or(0, Vec::len)
    }

    pub fn finish(&self) -> AggregateSeries<K> {
        let points = self
            .groups
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(key, rows)| {
                let width = rows[0].len();
                let mut mean = Vec::with_capacity(width);
                let mut std_error = Vec::with_capacity(width);
                for col in 0..width {
                    let mut column: Vec<f64> = rows.iter().map(|r| r[col]).collect();
                    let (m, se) = mean_and_std_error(&mut column);
                    mean.push(match self.mean_decimals {
                        Some(d) => round_to(m, d),
                        None => m,
                    });
                    std_error.push(se);
                }
                SeriesPoint {
                    key: key.clone(),
                    mean,
                    std_error,
                    runs: rows.len(),
                }
            })
            .collect();
        AggregateSeries { points }
    }
}

impl<K: Ord + Clone> Default for SeriesAggregator<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mean and standard error (`std(ddof=1) / sqrt(n)`) of `values`.
///
/// The values are sorted first so the floating point sums do not depend on
/// the order runs arrived in. Empty input gives `(0, 0)`; a single value, or
/// any set of identical values, has a standard error of exactly 0.
pub fn mean_and_std_error(values: &mut [f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    values.sort_by(f64::total_cmp);
    if values[0] == values[n - 1] {
        return (values[0], 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt() / (n as f64).sqrt())
}

/// Mean of a per-slot vector over the device slots of both PANs
pub fn device_mean(values: &[f64], layout: &PanLayout) -> f64 {
    let device_values: Vec<f64> = layout
        .device_slots()
        .filter_map(|slot| values.get(slot).copied())
        .collect();
    if device_values.is_empty() {
        return 0.0;
    }
    device_values.iter().sum::<f64>() / device_values.len() as f64
}
