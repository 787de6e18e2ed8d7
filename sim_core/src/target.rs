//! Encounter targets

use crate::aura::{AuraEffect, AuraTracker};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Index of a target within the encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub usize);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target {}", self.0)
    }
}

/// Defensive profile of a target
///
/// Chances are fractions. Defaults describe a raid boss three levels above
/// the attacker, attacked from behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_target_name")]
    pub name: String,
    #[serde(default = "default_armor")]
    pub armor: f64,
    #[serde(default = "default_spell_miss")]
    pub spell_miss_chance: f64,
    #[serde(default = "default_melee_miss")]
    pub melee_miss_chance: f64,
    #[serde(default = "default_dodge")]
    pub dodge_chance: f64,
    #[serde(default = "default_parry")]
    pub parry_chance: f64,
    #[serde(default = "default_glance")]
    pub glance_chance: f64,
    #[serde(default = "default_block")]
    pub block_chance: f64,
    #[serde(default)]
    pub block_value: f64,
    #[serde(default = "default_multiplier")]
    pub damage_taken_multiplier: f64,
    /// Parry and block only apply when attacked from the front
    #[serde(default = "default_true")]
    pub attack_from_behind: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            name: default_target_name(),
            armor: default_armor(),
            spell_miss_chance: default_spell_miss(),
            melee_miss_chance: default_melee_miss(),
            dodge_chance: default_dodge(),
            parry_chance: default_parry(),
            glance_chance: default_glance(),
            block_chance: default_block(),
            block_value: 0.0,
            damage_taken_multiplier: default_multiplier(),
            attack_from_behind: default_true(),
        }
    }
}

impl TargetConfig {
    /// Target with no avoidance and no armor
    pub fn training_dummy() -> Self {
        TargetConfig {
            name: "Training Dummy".to_string(),
            armor: 0.0,
            spell_miss_chance: 0.0,
            melee_miss_chance: 0.0,
            dodge_chance: 0.0,
            parry_chance: 0.0,
            glance_chance: 0.0,
            block_chance: 0.0,
            block_value: 0.0,
            damage_taken_multiplier: 1.0,
            attack_from_behind: true,
        }
    }
}

fn default_target_name() -> String {
    "Target".to_string()
}
fn default_armor() -> f64 {
    7684.0
}
fn default_spell_miss() -> f64 {
    0.17
}
fn default_melee_miss() -> f64 {
    0.08
}
fn default_dodge() -> f64 {
    0.065
}
fn default_parry() -> f64 {
    0.14
}
fn default_glance() -> f64 {
    0.24
}
fn default_block() -> f64 {
    0.05
}
fn default_multiplier() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}

/// A participant that only receives effects
///
/// Target auras are data-only debuffs: they carry an effect and uptime but
/// no hooks run on them.
pub struct Target {
    pub id: TargetId,
    pub config: TargetConfig,
    pub auras: AuraTracker,
    /// Damage taken this iteration
    pub damage_taken: f64,
}

impl Target {
    pub fn new(id: TargetId, config: TargetConfig) -> Self {
        Target {
            id,
            config,
            auras: AuraTracker::new(),
            damage_taken: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Base multiplier times every active damage-taken debuff
    pub fn damage_taken_multiplier(&self, now: Duration) -> f64 {
        let mut multiplier = self.config.damage_taken_multiplier;
        for (effect, stacks) in self.auras.active_effects(now) {
            if let AuraEffect::DamageTaken(per_stack) = effect {
                multiplier *= 1.0 + per_stack * stacks as f64;
            }
        }
        multiplier
    }

    /// Expire debuffs up to `now`
    pub fn advance(&mut self, now: Duration) {
        for slot in self.auras.advance(now) {
            self.auras.expire(slot, now);
        }
    }

    /// Close debuff windows at the end of an iteration
    ///
    /// Debuffs that ran out before `end` but were never advanced past are
    /// expired at their own expiry time first.
    pub fn close_iteration(&mut self, end: Duration) {
        self.advance(end);
        self.auras.close_uptime(end);
    }

    pub fn reset(&mut self) {
        self.auras.reset();
        self.damage_taken = 0.0;
    }
}
