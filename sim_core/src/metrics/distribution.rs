use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Width of a histogram bucket, in per-second units
pub const HISTOGRAM_BUCKET: f64 = 10.0;

/// Streaming distribution of a per-iteration rate (DPS, threat per second)
///
/// `total` is the current iteration's scratch value. The aggregate fields
/// only change in `done_iteration` and `merge`, so memory stays O(1) in the
/// number of iterations apart from the bounded histogram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributionMetrics {
    /// Running total for the current iteration
    pub total: f64,

    samples: u32,
    sum: f64,
    sum_squared: f64,
    max: f64,
    hist: BTreeMap<i32, u32>,
}

impl DistributionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.total = 0.0;
    }

    /// Fold the current iteration's total into the aggregate
    pub fn done_iteration(&mut self, encounter_secs: f64) {
        let rate = self.total / encounter_secs;
        self.add_sample(rate);
    }

    pub(crate) fn add_sample(&mut self, value: f64) {
        self.samples += 1;
        self.sum += value;
        self.sum_squared += value * value;
        self.max = if self.samples == 1 {
            value
        } else {
            self.max.max(value)
        };

        let bucket = ((value / HISTOGRAM_BUCKET).round() * HISTOGRAM_BUCKET) as i32;
        *self.hist.entry(bucket).or_insert(0) += 1;
    }

    /// Combine another partial aggregate into this one
    pub fn merge(&mut self, other: &DistributionMetrics) {
        if other.samples == 0 {
            return;
        }
        self.max = if self.samples == 0 {
            other.max
        } else {
            self.max.max(other.max)
        };
        self.samples += other.samples;
        self.sum += other.sum;
        self.sum_squared += other.sum_squared;
        for (bucket, count) in &other.hist {
            *self.hist.entry(*bucket).or_insert(0) += count;
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sum_squared(&self) -> f64 {
        self.sum_squared
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn histogram(&self) -> &BTreeMap<i32, u32> {
        &self.hist
    }

    pub fn summary(&self) -> DistributionSummary {
        let (mean, stdev) = mean_and_stdev(self.sum, self.sum_squared, self.samples);
        DistributionSummary {
            mean,
            stdev,
            max: self.max,
            hist: self.hist.clone(),
        }
    }
}

/// Final statistics of a distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub mean: f64,
    pub stdev: f64,
    pub max: f64,
    pub hist: BTreeMap<i32, u32>,
}

/// Mean and standard deviation from streaming sums
///
/// The variance `sum_sq / n - mean^2` can come out slightly negative for
/// near-identical samples, so it is clamped to zero before the root.
pub fn mean_and_stdev(sum: f64, sum_squared: f64, n: u32) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f64;
    let mean = sum / n;
    let variance = (sum_squared / n - mean * mean).max(0.0);
    (mean, variance.sqrt())
}
