//! Combat tuning constants

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::ConfigError;

/// Tunable combat constants
///
/// Owned by each `Simulation`; every field falls back to its default when
/// missing from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatConstants {
    #[serde(default)]
    pub ratings: RatingConstants,
    #[serde(default)]
    pub spell: SpellConstants,
    #[serde(default)]
    pub melee: MeleeConstants,
    #[serde(default)]
    pub resource: ResourceConstants,
}

impl CombatConstants {
    /// Load constants from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let constants: CombatConstants = super::load_toml(path)?;
        constants.validate()?;
        Ok(constants)
    }

    /// Parse constants from a TOML string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let constants: CombatConstants = super::parse_toml(content)?;
        constants.validate()?;
        Ok(constants)
    }

    /// Reject values that would divide by zero downstream
    pub fn validate(&self) -> Result<(), ConfigError> {
        let per_percent = [
            ("spell_hit_per_percent", self.ratings.spell_hit_per_percent),
            ("spell_crit_per_percent", self.ratings.spell_crit_per_percent),
            ("spell_haste_per_percent", self.ratings.spell_haste_per_percent),
            ("melee_hit_per_percent", self.ratings.melee_hit_per_percent),
            ("melee_crit_per_percent", self.ratings.melee_crit_per_percent),
            ("melee_haste_per_percent", self.ratings.melee_haste_per_percent),
        ];
        for (name, value) in per_percent {
            if !(value > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "ratings.{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.resource.tick_interval_secs > 0.0) {
            return Err(ConfigError::Validation(
                "resource.tick_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rating points needed for one percent of each chance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingConstants {
    #[serde(default = "default_spell_hit_per_percent")]
    pub spell_hit_per_percent: f64,
    #[serde(default = "default_spell_crit_per_percent")]
    pub spell_crit_per_percent: f64,
    #[serde(default = "default_haste_per_percent")]
    pub spell_haste_per_percent: f64,
    #[serde(default = "default_melee_hit_per_percent")]
    pub melee_hit_per_percent: f64,
    #[serde(default = "default_melee_crit_per_percent")]
    pub melee_crit_per_percent: f64,
    #[serde(default = "default_haste_per_percent")]
    pub melee_haste_per_percent: f64,
    /// Dodge reduction per expertise point, as a fraction
    #[serde(default = "default_expertise_dodge_reduction")]
    pub expertise_dodge_reduction: f64,
}

impl Default for RatingConstants {
    fn default() -> Self {
        RatingConstants {
            spell_hit_per_percent: default_spell_hit_per_percent(),
            spell_crit_per_percent: default_spell_crit_per_percent(),
            spell_haste_per_percent: default_haste_per_percent(),
            melee_hit_per_percent: default_melee_hit_per_percent(),
            melee_crit_per_percent: default_melee_crit_per_percent(),
            melee_haste_per_percent: default_haste_per_percent(),
            expertise_dodge_reduction: default_expertise_dodge_reduction(),
        }
    }
}

fn default_spell_hit_per_percent() -> f64 {
    12.6
}
fn default_spell_crit_per_percent() -> f64 {
    22.08
}
fn default_haste_per_percent() -> f64 {
    15.77
}
fn default_melee_hit_per_percent() -> f64 {
    15.77
}
fn default_melee_crit_per_percent() -> f64 {
    22.08
}
fn default_expertise_dodge_reduction() -> f64 {
    0.0025
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellConstants {
    /// Crit damage multiplier for spells (1.5 = 150%)
    #[serde(default = "default_spell_crit_multiplier")]
    pub crit_multiplier: f64,
    /// Miss chance that hit rating cannot remove
    #[serde(default = "default_min_spell_miss")]
    pub min_miss_chance: f64,
}

impl Default for SpellConstants {
    fn default() -> Self {
        SpellConstants {
            crit_multiplier: default_spell_crit_multiplier(),
            min_miss_chance: default_min_spell_miss(),
        }
    }
}

fn default_spell_crit_multiplier() -> f64 {
    1.5
}
fn default_min_spell_miss() -> f64 {
    0.01
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeleeConstants {
    #[serde(default = "default_melee_crit_multiplier")]
    pub crit_multiplier: f64,
    /// Damage multiplier applied to glancing blows
    #[serde(default = "default_glance_multiplier")]
    pub glance_multiplier: f64,
    /// Armor constant in `armor / (armor + constant)`
    #[serde(default = "default_armor_constant")]
    pub armor_constant: f64,
}

impl Default for MeleeConstants {
    fn default() -> Self {
        MeleeConstants {
            crit_multiplier: default_melee_crit_multiplier(),
            glance_multiplier: default_glance_multiplier(),
            armor_constant: default_armor_constant(),
        }
    }
}

fn default_melee_crit_multiplier() -> f64 {
    2.0
}
fn default_glance_multiplier() -> f64 {
    0.75
}
fn default_armor_constant() -> f64 {
    10557.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConstants {
    /// Interval between resource-tick notifications to agents
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: f64,
    /// Shortest allowed global cooldown after haste
    #[serde(default = "default_min_gcd")]
    pub min_gcd_secs: f64,
}

impl Default for ResourceConstants {
    fn default() -> Self {
        ResourceConstants {
            tick_interval_secs: default_tick_interval(),
            min_gcd_secs: default_min_gcd(),
        }
    }
}

impl ResourceConstants {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_secs)
    }

    pub fn min_gcd(&self) -> Duration {
        Duration::from_secs_f64(self.min_gcd_secs)
    }
}

fn default_tick_interval() -> f64 {
    2.0
}
fn default_min_gcd() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        let constants = CombatConstants::default();
        assert!((constants.spell.crit_multiplier - 1.5).abs() < f64::EPSILON);
        assert!((constants.melee.glance_multiplier - 0.75).abs() < f64::EPSILON);
        assert_eq!(constants.resource.tick_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_parse_partial_constants() {
        let toml = r#"
[spell]
crit_multiplier = 2.0

[resource]
tick_interval_secs = 5.0
"#;

        let constants = CombatConstants::parse(toml).unwrap();
        assert!((constants.spell.crit_multiplier - 2.0).abs() < f64::EPSILON);
        assert!((constants.spell.min_miss_chance - 0.01).abs() < f64::EPSILON);
        assert!((constants.ratings.spell_hit_per_percent - 12.6).abs() < f64::EPSILON);
        assert_eq!(constants.resource.tick_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_rating_rejected() {
        let toml = r#"
[ratings]
spell_crit_per_percent = 0.0
"#;

        let err = CombatConstants::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = CombatConstants::load_from_path(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
