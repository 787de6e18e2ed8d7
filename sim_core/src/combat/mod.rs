//! Combat resolution
//!
//! Attack-table rolls, damage math, DoT slots and the cast pipeline that ties
//! them to character state. The pipeline itself lives on [`crate::sim::Sim`]
//! (see `resolution.rs`) because it needs the clock, RNG and every target.

mod cast;
mod damage;
mod dot;
mod outcome;
mod resolution;

pub use cast::{
    Cast, CastAttempt, DamageInput, DamageModifier, Debuff, ModifierChain, ModifierSource,
    PowerSource, DEFAULT_GCD,
};
pub use damage::{apply_aoe_cap, armor_mitigation, crit_multiplier, Mitigation, MAX_ARMOR_MITIGATION};
pub use dot::{DotInput, DotRefresh, DotSlot, DotTarget, DotTracker};
pub use outcome::{AttackTable, HitOutcome, HitTable};

use crate::target::TargetId;
use stats_core::ActionId;

/// Result of one hit or periodic tick against one target
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub action: ActionId,
    pub target: TargetId,
    pub outcome: HitOutcome,
    /// Final damage after every modifier, mitigation and cap
    pub damage: f64,
    pub threat: f64,
    /// True for DoT ticks
    pub periodic: bool,
}

impl HitResult {
    pub fn landed(&self) -> bool {
        self.outcome.landed()
    }
}
