use crate::combat::{HitOutcome, HitResult};
use serde::{Deserialize, Serialize};
use stats_core::ActionId;

/// Counters for one action key, summed over all iterations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionMetrics {
    pub action: ActionId,
    /// True if the action resolves on the melee table
    pub is_melee: bool,

    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,

    // Zero for spell actions
    pub dodges: u64,
    pub parries: u64,
    pub blocks: u64,
    pub glances: u64,

    /// Periodic damage ticks
    pub ticks: u64,

    pub damage: f64,
    pub threat: f64,
}

impl ActionMetrics {
    pub fn new(action: ActionId, is_melee: bool) -> Self {
        ActionMetrics {
            action,
            is_melee,
            ..Default::default()
        }
    }

    /// Count one landed or avoided hit
    pub fn record(&mut self, hit: &HitResult) {
        if hit.periodic {
            self.ticks += 1;
        } else {
            match hit.outcome {
                HitOutcome::Miss => self.misses += 1,
                HitOutcome::Dodge => self.dodges += 1,
                HitOutcome::Parry => self.parries += 1,
                HitOutcome::Glance => {
                    self.glances += 1;
                    self.hits += 1;
                }
                HitOutcome::Block => {
                    self.blocks += 1;
                    self.hits += 1;
                }
                HitOutcome::Crit => {
                    self.crits += 1;
                    self.hits += 1;
                }
                HitOutcome::Hit => self.hits += 1,
            }
        }
        self.damage += hit.damage;
        self.threat += hit.threat;
    }

    pub fn merge(&mut self, other: &ActionMetrics) {
        self.is_melee |= other.is_melee;
        self.casts += other.casts;
        self.hits += other.hits;
        self.crits += other.crits;
        self.misses += other.misses;
        self.dodges += other.dodges;
        self.parries += other.parries;
        self.blocks += other.blocks;
        self.glances += other.glances;
        self.ticks += other.ticks;
        self.damage += other.damage;
        self.threat += other.threat;
    }

    /// Avoided attempts of any kind
    pub fn avoided(&self) -> u64 {
        self.misses + self.dodges + self.parries
    }
}
