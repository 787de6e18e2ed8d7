//! Damage math
//!
//! No intermediate rounding: amounts stay `f64` until reporting.

use super::outcome::{AttackTable, HitOutcome};
use crate::character::PseudoStats;
use crate::config::CombatConstants;
use crate::target::TargetConfig;
use stats_core::SpellSchool;

/// Maximum fraction of damage armor can remove
pub const MAX_ARMOR_MITIGATION: f64 = 0.75;

/// Fraction of physical damage removed by armor
pub fn armor_mitigation(armor: f64, armor_constant: f64) -> f64 {
    if armor <= 0.0 {
        return 0.0;
    }
    (armor / (armor + armor_constant)).min(MAX_ARMOR_MITIGATION)
}

/// Crit multiplier for a table, including bonus crit damage
pub fn crit_multiplier(table: AttackTable, pseudo: &PseudoStats, constants: &CombatConstants) -> f64 {
    let base = if table.is_melee() {
        constants.melee.crit_multiplier
    } else {
        constants.spell.crit_multiplier
    };
    1.0 + (base - 1.0) * (1.0 + pseudo.crit_damage_bonus)
}

/// Inputs that turn a pre-outcome amount into final damage against one target
pub struct Mitigation<'a> {
    pub school: SpellSchool,
    pub table: AttackTable,
    pub target: &'a TargetConfig,
    /// Target-side multiplier (config and debuffs)
    pub taken_multiplier: f64,
    pub constants: &'a CombatConstants,
}

impl Mitigation<'_> {
    /// Apply outcome and target-side reductions to `amount`
    ///
    /// Order: damage taken, armor (physical only), then the outcome's own
    /// scaling. Avoided outcomes deal nothing; a block subtracts the block
    /// value after everything else.
    pub fn apply(&self, amount: f64, outcome: HitOutcome, pseudo: &PseudoStats) -> f64 {
        if !outcome.landed() {
            return 0.0;
        }

        let mut damage = amount * self.taken_multiplier;
        if self.school == SpellSchool::Physical {
            damage *= 1.0 - armor_mitigation(self.target.armor, self.constants.melee.armor_constant);
        }

        match outcome {
            HitOutcome::Crit => damage * crit_multiplier(self.table, pseudo, self.constants),
            HitOutcome::Glance => damage * self.constants.melee.glance_multiplier,
            HitOutcome::Block => (damage - self.target.block_value).max(0.0),
            _ => damage,
        }
    }
}

/// Scale every instance by `cap / total` when their sum exceeds `cap`
///
/// Returns the factor applied (1.0 when under the cap). All instances are
/// scaled by the same factor; there is no per-target cutoff.
pub fn apply_aoe_cap(amounts: &mut [f64], cap: f64) -> f64 {
    let total: f64 = amounts.iter().sum();
    if total <= cap || total <= 0.0 {
        return 1.0;
    }
    let factor = cap / total;
    for amount in amounts.iter_mut() {
        *amount *= factor;
    }
    factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mitigation<'a>(target: &'a TargetConfig, constants: &'a CombatConstants, school: SpellSchool) -> Mitigation<'a> {
        Mitigation {
            school,
            table: if school == SpellSchool::Physical {
                AttackTable::MeleeWhite
            } else {
                AttackTable::Spell
            },
            target,
            taken_multiplier: 1.0,
            constants,
        }
    }

    #[test]
    fn test_armor_mitigation() {
        assert_eq!(armor_mitigation(0.0, 10557.5), 0.0);
        assert!((armor_mitigation(10557.5, 10557.5) - 0.5).abs() < 1e-12);
        assert!((armor_mitigation(1e9, 10557.5) - MAX_ARMOR_MITIGATION).abs() < 1e-12);
    }

    #[test]
    fn test_outcome_scaling() {
        let constants = CombatConstants::default();
        let target = TargetConfig::training_dummy();
        let pseudo = PseudoStats::default();

        let spell = mitigation(&target, &constants, SpellSchool::Fire);
        assert!((spell.apply(100.0, HitOutcome::Hit, &pseudo) - 100.0).abs() < 1e-9);
        assert!((spell.apply(100.0, HitOutcome::Crit, &pseudo) - 150.0).abs() < 1e-9);
        assert_eq!(spell.apply(100.0, HitOutcome::Miss, &pseudo), 0.0);

        let melee = mitigation(&target, &constants, SpellSchool::Physical);
        assert!((melee.apply(100.0, HitOutcome::Crit, &pseudo) - 200.0).abs() < 1e-9);
        assert!((melee.apply(100.0, HitOutcome::Glance, &pseudo) - 75.0).abs() < 1e-9);
        assert_eq!(melee.apply(100.0, HitOutcome::Parry, &pseudo), 0.0);
    }

    #[test]
    fn test_block_subtracts_value() {
        let constants = CombatConstants::default();
        let mut target = TargetConfig::training_dummy();
        target.block_value = 30.0;
        let melee = mitigation(&target, &constants, SpellSchool::Physical);

        let pseudo = PseudoStats::default();
        assert!((melee.apply(100.0, HitOutcome::Block, &pseudo) - 70.0).abs() < 1e-9);
        assert_eq!(melee.apply(20.0, HitOutcome::Block, &pseudo), 0.0);
    }

    #[test]
    fn test_crit_damage_bonus() {
        let constants = CombatConstants::default();
        let pseudo = PseudoStats {
            crit_damage_bonus: 0.5,
            ..Default::default()
        };
        assert!((crit_multiplier(AttackTable::Spell, &pseudo, &constants) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_aoe_cap_scales_every_instance() {
        let mut amounts = [100.0; 5];
        let factor = apply_aoe_cap(&mut amounts, 300.0);
        assert!((factor - 0.6).abs() < 1e-12);
        for a in amounts {
            assert!((a - 60.0).abs() < 1e-9);
        }

        let mut uneven = [200.0, 100.0, 0.0];
        apply_aoe_cap(&mut uneven, 150.0);
        assert!((uneven[0] - 100.0).abs() < 1e-9);
        assert!((uneven[1] - 50.0).abs() < 1e-9);
        assert_eq!(uneven[2], 0.0);
    }

    #[test]
    fn test_aoe_under_cap_untouched() {
        let mut amounts = [100.0, 100.0];
        assert_eq!(apply_aoe_cap(&mut amounts, 300.0), 1.0);
        assert_eq!(amounts, [100.0, 100.0]);
    }
}
