//! Simulation request
//!
//! The request is plain data: which players, what they wear, the encounter
//! and the run options. Spec options and talents are opaque TOML values only
//! the registered spec factory interprets.

use crate::character::Weapon;
use crate::error::ValidationError;
use crate::target::TargetConfig;
use serde::{Deserialize, Serialize};
use stats_core::StatMap;
use std::time::Duration;

/// Everything needed to run one simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRequest {
    pub players: Vec<PlayerConfig>,
    #[serde(default)]
    pub encounter: EncounterConfig,
    #[serde(default)]
    pub options: SimOptions,
}

impl SimRequest {
    /// Reject degenerate run parameters before any state is built
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.options.iterations == 0 {
            return Err(ValidationError::ZeroIterations);
        }
        self.encounter.duration()?;
        if self.encounter.resolved_targets().is_empty() {
            return Err(ValidationError::NoTargets);
        }
        if self.players.is_empty() {
            return Err(ValidationError::NoPlayers);
        }
        if self.options.progress_interval == Some(0) {
            return Err(ValidationError::ZeroProgressInterval);
        }
        for player in &self.players {
            if let Some(weapon) = &player.weapon {
                if positive_duration(weapon.swing_speed_secs).is_none() {
                    return Err(ValidationError::InvalidSwingSpeed {
                        player: player.name.clone(),
                        secs: weapon.swing_speed_secs,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Spec tag plus the options its factory deserializes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecOptions {
    pub tag: String,
    #[serde(default = "empty_table")]
    pub options: toml::Value,
}

impl SpecOptions {
    pub fn new(tag: impl Into<String>) -> Self {
        SpecOptions {
            tag: tag.into(),
            options: empty_table(),
        }
    }
}

/// One equipped item; the id selects a registered effect, if any
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquippedItem {
    pub id: i32,
    #[serde(default)]
    pub gems: Vec<i32>,
    #[serde(default)]
    pub enchant: Option<i32>,
    /// Flat stats the item grants
    #[serde(default)]
    pub stats: StatMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
    pub spec: SpecOptions,
    #[serde(default)]
    pub base_stats: StatMap,
    #[serde(default)]
    pub equipment: Vec<EquippedItem>,
    /// Flat raid, party and self buff stats
    #[serde(default)]
    pub buffs: StatMap,
    #[serde(default)]
    pub consumables: Vec<String>,
    #[serde(default = "empty_table")]
    pub talents: toml::Value,
    #[serde(default)]
    pub weapon: Option<Weapon>,
}

impl PlayerConfig {
    pub fn new(name: impl Into<String>, spec: SpecOptions) -> Self {
        PlayerConfig {
            name: name.into(),
            spec,
            base_stats: StatMap::new(),
            equipment: Vec::new(),
            buffs: StatMap::new(),
            consumables: Vec::new(),
            talents: empty_table(),
            weapon: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterConfig {
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetConfig>,
    /// Pads the target list to this many by copying the first target
    #[serde(default)]
    pub target_count: usize,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        EncounterConfig {
            duration_secs: default_duration(),
            targets: default_targets(),
            target_count: 0,
        }
    }
}

impl EncounterConfig {
    /// Encounter length as a non-zero `Duration`
    pub fn duration(&self) -> Result<Duration, ValidationError> {
        positive_duration(self.duration_secs).ok_or(ValidationError::InvalidDuration(self.duration_secs))
    }

    /// Target list with `target_count` applied
    pub fn resolved_targets(&self) -> Vec<TargetConfig> {
        let mut targets = self.targets.clone();
        if self.target_count > targets.len() {
            let template = targets.first().cloned().unwrap_or_default();
            for n in targets.len()..self.target_count {
                let mut copy = template.clone();
                copy.name = format!("{} {}", template.name, n + 1);
                targets.push(copy);
            }
        }
        targets
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimOptions {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub seed: u64,
    /// Record a combat log of the first iteration
    #[serde(default)]
    pub debug: bool,
    /// Worker threads, 0 for one per core
    #[serde(default)]
    pub threads: usize,
    /// Iterations between progress snapshots
    #[serde(default)]
    pub progress_interval: Option<u32>,
}

impl Default for SimOptions {
    fn default() -> Self {
        SimOptions {
            iterations: default_iterations(),
            seed: 0,
            debug: false,
            threads: 0,
            progress_interval: None,
        }
    }
}

/// Seconds that convert to a non-zero `Duration`
///
/// Rejects NaN, infinities, negatives, values past `Duration::MAX` and values
/// that round down to zero nanoseconds.
fn positive_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero())
}

fn empty_table() -> toml::Value {
    toml::Value::Table(toml::map::Map::new())
}

fn default_duration() -> f64 {
    180.0
}

fn default_targets() -> Vec<TargetConfig> {
    vec![TargetConfig::default()]
}

fn default_iterations() -> u32 {
    1000
}
