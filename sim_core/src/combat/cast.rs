//! Cast descriptors

use super::dot::DotInput;
use super::outcome::AttackTable;
use crate::aura::{Aura, ReapplyPolicy};
use crate::rng::RandomStreams;
use serde::{Deserialize, Serialize};
use stats_core::{ActionId, SpellSchool, Stat, Stats};
use std::time::Duration;

/// Default global cooldown triggered by on-GCD casts
pub const DEFAULT_GCD: Duration = Duration::from_millis(1500);

/// Attacker stat that scales an action's damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerSource {
    #[default]
    None,
    /// Generic spell power plus the school's own power
    SpellPower,
    AttackPower,
    RangedAttackPower,
}

/// Base damage: a uniform range plus a coefficient of attacker power
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageInput {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub coefficient: f64,
    #[serde(default)]
    pub power: PowerSource,
}

impl DamageInput {
    pub fn fixed(amount: f64) -> Self {
        DamageInput {
            min: amount,
            max: amount,
            ..Default::default()
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        DamageInput {
            min,
            max,
            ..Default::default()
        }
    }

    pub fn scaled(mut self, power: PowerSource, coefficient: f64) -> Self {
        self.power = power;
        self.coefficient = coefficient;
        self
    }

    /// Attacker power that applies to this input
    pub fn power_value(&self, stats: &Stats, school: SpellSchool) -> f64 {
        match self.power {
            PowerSource::None => 0.0,
            PowerSource::SpellPower => {
                stats[Stat::SpellPower] + school.power_stat().map_or(0.0, |s| stats[s])
            }
            PowerSource::AttackPower => stats[Stat::AttackPower],
            PowerSource::RangedAttackPower => stats[Stat::RangedAttackPower],
        }
    }

    /// Roll the base amount on the damage stream
    pub fn roll(&self, stats: &Stats, school: SpellSchool, rng: &mut RandomStreams) -> f64 {
        rng.range("damage roll", self.min, self.max) + self.coefficient * self.power_value(stats, school)
    }
}

/// Where a damage modifier comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierSource {
    Talent,
    Buff,
    Debuff,
    SetBonus,
    Race,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageModifier {
    pub source: ModifierSource,
    pub multiplier: f64,
}

/// Ordered chain of independent multiplicative modifiers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModifierChain(Vec<DamageModifier>);

impl ModifierChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: ModifierSource, multiplier: f64) {
        self.0.push(DamageModifier { source, multiplier });
    }

    /// Product of every modifier, applied in insertion order
    pub fn apply(&self, amount: f64) -> f64 {
        self.0.iter().fold(amount, |acc, m| acc * m.multiplier)
    }

    /// Product of the modifiers of one source
    pub fn product_of(&self, source: ModifierSource) -> f64 {
        self.0
            .iter()
            .filter(|m| m.source == source)
            .fold(1.0, |acc, m| acc * m.multiplier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DamageModifier> {
        self.0.iter()
    }
}

/// Debuff left on each target an action lands on
#[derive(Debug, Clone, PartialEq)]
pub struct Debuff {
    pub action: ActionId,
    pub label: String,
    pub duration: Duration,
    pub policy: ReapplyPolicy,
    /// Extra damage taken per stack, as a fraction
    pub damage_taken_per_stack: f64,
}

impl Debuff {
    pub fn to_aura(&self) -> Aura {
        Aura::new(self.action, self.label.clone(), self.duration)
            .with_policy(self.policy)
            .with_damage_taken(self.damage_taken_per_stack)
    }
}

/// One attempted action
///
/// Short-lived: built by the rotation (or a proc) for each attempt. Before-cast
/// hooks receive a copy they may adjust.
#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub action: ActionId,
    /// Required for every cast; a cast without one is a configuration bug
    pub school: Option<SpellSchool>,
    pub table: AttackTable,
    pub cost: f64,
    pub cast_time: Duration,
    /// Global cooldown triggered, `None` for off-GCD actions
    pub gcd: Option<Duration>,
    pub cooldown: Option<Duration>,
    pub damage: Option<DamageInput>,
    pub modifiers: ModifierChain,
    /// Extra crit chance for this action only
    pub bonus_crit_chance: f64,
    pub threat_multiplier: f64,
    /// Hit every target instead of the selected one
    pub area: bool,
    /// Total raw damage the area instances may deal before being scaled
    pub aoe_cap: Option<f64>,
    pub dot: Option<DotInput>,
    pub debuff: Option<Debuff>,
}

impl Cast {
    pub fn spell(action: ActionId, school: SpellSchool) -> Self {
        Cast {
            action,
            school: Some(school),
            table: AttackTable::Spell,
            cost: 0.0,
            cast_time: Duration::ZERO,
            gcd: Some(DEFAULT_GCD),
            cooldown: None,
            damage: None,
            modifiers: ModifierChain::new(),
            bonus_crit_chance: 0.0,
            threat_multiplier: 1.0,
            area: false,
            aoe_cap: None,
            dot: None,
            debuff: None,
        }
    }

    /// Physical special attack on the melee table
    pub fn melee(action: ActionId) -> Self {
        Cast {
            table: AttackTable::Melee,
            ..Self::spell(action, SpellSchool::Physical)
        }
    }

    pub fn with_damage(mut self, damage: DamageInput) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_cast_time(mut self, cast_time: Duration) -> Self {
        self.cast_time = cast_time;
        self
    }

    pub fn with_gcd(mut self, gcd: Duration) -> Self {
        self.gcd = Some(gcd);
        self
    }

    pub fn off_gcd(mut self) -> Self {
        self.gcd = None;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn with_modifier(mut self, source: ModifierSource, multiplier: f64) -> Self {
        self.modifiers.push(source, multiplier);
        self
    }

    pub fn with_threat_multiplier(mut self, multiplier: f64) -> Self {
        self.threat_multiplier = multiplier;
        self
    }

    /// Hit every target, optionally capping the combined raw damage
    pub fn area(mut self, cap: Option<f64>) -> Self {
        self.area = true;
        self.aoe_cap = cap;
        self
    }

    pub fn with_dot(mut self, dot: DotInput) -> Self {
        self.dot = Some(dot);
        self
    }

    pub fn with_debuff(mut self, debuff: Debuff) -> Self {
        self.debuff = Some(debuff);
        self
    }
}

/// Outcome of asking to cast
///
/// The negative variants are ordinary results for the rotation to act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CastAttempt {
    /// A cast-time action is now in flight
    Started,
    /// An instant action resolved
    Completed,
    InsufficientResource { needed: f64 },
    OnCooldown { ready_at: Duration },
    NoTarget,
}

impl CastAttempt {
    pub fn is_success(self) -> bool {
        matches!(self, CastAttempt::Started | CastAttempt::Completed)
    }
}
