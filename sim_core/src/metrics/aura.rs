use super::distribution::mean_and_stdev;
use serde::{Deserialize, Serialize};
use stats_core::ActionId;

/// Streaming uptime statistics for one aura id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuraMetrics {
    pub action: ActionId,
    uptime_sum: f64,
    uptime_sum_squared: f64,
    procs: u64,
}

impl AuraMetrics {
    pub fn new(action: ActionId) -> Self {
        AuraMetrics {
            action,
            ..Default::default()
        }
    }

    /// Fold one iteration's uptime (seconds) and gain count
    pub fn add_iteration(&mut self, uptime_secs: f64, gains: u32) {
        self.uptime_sum += uptime_secs;
        self.uptime_sum_squared += uptime_secs * uptime_secs;
        self.procs += gains as u64;
    }

    pub fn merge(&mut self, other: &AuraMetrics) {
        self.uptime_sum += other.uptime_sum;
        self.uptime_sum_squared += other.uptime_sum_squared;
        self.procs += other.procs;
    }

    /// Summary over `iterations`; iterations where the aura never appeared
    /// count as zero uptime
    pub fn summary(&self, iterations: u32, encounter_secs: f64) -> AuraSummary {
        let (mean, stdev) = mean_and_stdev(self.uptime_sum, self.uptime_sum_squared, iterations);
        AuraSummary {
            action: self.action,
            uptime_secs_avg: mean,
            uptime_secs_stdev: stdev,
            uptime_fraction: if encounter_secs > 0.0 {
                mean / encounter_secs
            } else {
                0.0
            },
            procs_avg: if iterations > 0 {
                self.procs as f64 / iterations as f64
            } else {
                0.0
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuraSummary {
    pub action: ActionId,
    pub uptime_secs_avg: f64,
    pub uptime_secs_stdev: f64,
    pub uptime_fraction: f64,
    pub procs_avg: f64,
}
