use super::AuraMetrics;
use crate::aura::AuraUptime;
use stats_core::ActionKey;
use std::collections::BTreeMap;

/// Damage taken and debuff uptime of one target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetMetrics {
    damage_taken_sum: f64,
    auras: BTreeMap<ActionKey, AuraMetrics>,
}

impl TargetMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one iteration's damage taken and closed debuff windows
    pub fn add_iteration(&mut self, damage_taken: f64, uptimes: impl IntoIterator<Item = AuraUptime>) {
        self.damage_taken_sum += damage_taken;
        for uptime in uptimes {
            self.auras
                .entry(uptime.action.key())
                .or_insert_with(|| AuraMetrics::new(uptime.action))
                .add_iteration(uptime.uptime.as_secs_f64(), uptime.gains);
        }
    }

    pub fn merge(&mut self, other: &TargetMetrics) {
        self.damage_taken_sum += other.damage_taken_sum;
        for (key, aura) in &other.auras {
            self.auras
                .entry(*key)
                .or_insert_with(|| AuraMetrics::new(aura.action))
                .merge(aura);
        }
    }

    pub fn damage_taken_sum(&self) -> f64 {
        self.damage_taken_sum
    }

    pub fn auras(&self) -> impl Iterator<Item = &AuraMetrics> {
        self.auras.values()
    }
}
