//! Attack tables and outcome rolls

use crate::character::PseudoStats;
use crate::config::CombatConstants;
use crate::target::TargetConfig;
use serde::{Deserialize, Serialize};
use stats_core::{Stat, Stats};
use std::fmt;

/// Which attack table an action resolves on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackTable {
    /// Miss, Crit, Hit
    Spell,
    /// Full table without glancing blows (special attacks)
    Melee,
    /// Full table including glancing blows (auto attacks)
    MeleeWhite,
}

impl AttackTable {
    pub fn is_melee(self) -> bool {
        !matches!(self, AttackTable::Spell)
    }

    pub(crate) fn rng_label(self) -> &'static str {
        match self {
            AttackTable::Spell => "spell hit table",
            AttackTable::Melee | AttackTable::MeleeWhite => "melee hit table",
        }
    }
}

/// Result category of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitOutcome {
    Miss,
    Dodge,
    Parry,
    Glance,
    Block,
    Crit,
    Hit,
}

impl HitOutcome {
    /// True if the attack connected (glances and blocks included)
    pub fn landed(self) -> bool {
        !matches!(self, HitOutcome::Miss | HitOutcome::Dodge | HitOutcome::Parry)
    }
}

impl fmt::Display for HitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HitOutcome::Miss => "miss",
            HitOutcome::Dodge => "dodge",
            HitOutcome::Parry => "parry",
            HitOutcome::Glance => "glance",
            HitOutcome::Block => "block",
            HitOutcome::Crit => "crit",
            HitOutcome::Hit => "hit",
        };
        write!(f, "{}", s)
    }
}

/// Slice widths of an attack table, each a probability in `[0, 1]`
///
/// Slices are laid out in the fixed order Miss, Dodge, Parry, Glance, Block,
/// Crit. Mass pushed past 1.0 is lost from the later slices and anything left
/// over is a normal hit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitTable {
    pub miss: f64,
    pub dodge: f64,
    pub parry: f64,
    pub glance: f64,
    pub block: f64,
    pub crit: f64,
}

impl HitTable {
    pub fn spell(
        stats: &Stats,
        pseudo: &PseudoStats,
        target: &TargetConfig,
        constants: &CombatConstants,
        bonus_crit: f64,
    ) -> Self {
        let ratings = &constants.ratings;
        let hit = stats[Stat::SpellHitRating] / ratings.spell_hit_per_percent / 100.0
            + pseudo.bonus_hit_chance;
        let floor = target.spell_miss_chance.min(constants.spell.min_miss_chance);
        let crit = stats[Stat::SpellCritRating] / ratings.spell_crit_per_percent / 100.0
            + pseudo.bonus_crit_chance
            + bonus_crit;

        HitTable {
            miss: (target.spell_miss_chance - hit).max(floor),
            crit: crit.max(0.0),
            ..Default::default()
        }
    }

    pub fn melee(
        stats: &Stats,
        pseudo: &PseudoStats,
        target: &TargetConfig,
        constants: &CombatConstants,
        white: bool,
        bonus_crit: f64,
    ) -> Self {
        let ratings = &constants.ratings;
        let hit = stats[Stat::MeleeHitRating] / ratings.melee_hit_per_percent / 100.0
            + pseudo.bonus_hit_chance;
        let dodge_reduction = stats[Stat::Expertise] * ratings.expertise_dodge_reduction;
        let crit = stats[Stat::MeleeCritRating] / ratings.melee_crit_per_percent / 100.0
            + pseudo.bonus_crit_chance
            + bonus_crit;
        let front = !target.attack_from_behind;

        HitTable {
            miss: (target.melee_miss_chance - hit).max(0.0),
            dodge: (target.dodge_chance - dodge_reduction).max(0.0),
            parry: if front { target.parry_chance } else { 0.0 },
            glance: if white { target.glance_chance } else { 0.0 },
            block: if front { target.block_chance } else { 0.0 },
            crit: crit.max(0.0),
        }
    }

    /// Map a uniform draw in `[0, 1)` to an outcome
    pub fn roll(&self, draw: f64) -> HitOutcome {
        let slices = [
            (self.miss, HitOutcome::Miss),
            (self.dodge, HitOutcome::Dodge),
            (self.parry, HitOutcome::Parry),
            (self.glance, HitOutcome::Glance),
            (self.block, HitOutcome::Block),
            (self.crit, HitOutcome::Crit),
        ];

        let mut edge = 0.0;
        for (chance, outcome) in slices {
            edge += chance;
            if draw < edge {
                return outcome;
            }
        }
        HitOutcome::Hit
    }
}
