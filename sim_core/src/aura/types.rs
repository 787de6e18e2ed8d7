//! Aura definitions and hook contract

use crate::character::Character;
use crate::combat::{Cast, HitResult};
use crate::rng::RandomStreams;
use crate::target::TargetId;
use stats_core::{ActionId, ActionKey, Stats};
use std::fmt;
use std::time::Duration;

/// Aura identity, derived from the source effect's [`ActionId`]
pub type AuraId = ActionKey;

/// What happens when an aura that is already active is added again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapplyPolicy {
    /// Reset the duration
    Refresh,
    /// Reset the duration and add one stack, up to the cap
    Stack { max_stacks: u32 },
    /// Keep the running instance untouched
    Reject,
}

impl Default for ReapplyPolicy {
    fn default() -> Self {
        ReapplyPolicy::Refresh
    }
}

/// Passive effect carried by an aura, scaled by its stack count
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AuraEffect {
    #[default]
    None,
    /// Bonus stats per stack, added to the owner's current stats
    Stats(Stats),
    /// Extra damage taken per stack, as a fraction (0.05 = +5%)
    DamageTaken(f64),
}

/// A time-bounded status effect
pub struct Aura {
    pub action: ActionId,
    pub label: String,
    pub duration: Duration,
    pub policy: ReapplyPolicy,
    pub effect: AuraEffect,
    pub hooks: Option<Box<dyn AuraHooks>>,
}

impl Aura {
    pub fn new(action: ActionId, label: impl Into<String>, duration: Duration) -> Self {
        Aura {
            action,
            label: label.into(),
            duration,
            policy: ReapplyPolicy::Refresh,
            effect: AuraEffect::None,
            hooks: None,
        }
    }

    /// Aura that lasts for the whole encounter
    pub fn permanent(action: ActionId, label: impl Into<String>) -> Self {
        Self::new(action, label, Duration::MAX)
    }

    pub fn with_policy(mut self, policy: ReapplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.effect = AuraEffect::Stats(stats);
        self
    }

    pub fn with_damage_taken(mut self, per_stack: f64) -> Self {
        self.effect = AuraEffect::DamageTaken(per_stack);
        self
    }

    pub fn with_hooks(mut self, hooks: impl AuraHooks + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    pub fn id(&self) -> AuraId {
        self.action.key()
    }
}

impl fmt::Debug for Aura {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aura")
            .field("action", &self.action)
            .field("label", &self.label)
            .field("duration", &self.duration)
            .field("policy", &self.policy)
            .field("effect", &self.effect)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Extension points an aura can react to
///
/// Every method defaults to doing nothing. Effect state such as internal
/// cooldowns lives in the implementing type and is reset by re-creating the
/// aura each iteration.
#[allow(unused_variables)]
pub trait AuraHooks {
    fn on_gain(&mut self, ctx: &mut AuraContext<'_>) {}

    fn on_expire(&mut self, ctx: &mut AuraContext<'_>) {}

    fn on_stacks_changed(&mut self, ctx: &mut AuraContext<'_>, old: u32, new: u32) {}

    /// Runs before the cost is checked; may adjust the cast
    fn on_before_cast(&mut self, ctx: &mut AuraContext<'_>, cast: &mut Cast) {}

    fn on_cast_complete(&mut self, ctx: &mut AuraContext<'_>, cast: &Cast) {}

    fn on_spell_hit(&mut self, ctx: &mut AuraContext<'_>, hit: &HitResult) {}

    fn on_before_melee(&mut self, ctx: &mut AuraContext<'_>) {}

    fn on_melee_attack(&mut self, ctx: &mut AuraContext<'_>, hit: &HitResult) {}

    fn on_periodic_tick(&mut self, ctx: &mut AuraContext<'_>, tick: &HitResult) {}
}

/// Cast queued by a hook, resolved once the current event has finished
#[derive(Debug, Clone)]
pub struct TriggeredCast {
    pub cast: Cast,
    pub target: TargetId,
}

/// Engine state shared by every hook call of one event
pub(crate) struct HookEnv<'a> {
    pub now: Duration,
    pub rng: &'a mut RandomStreams,
    pub triggered: &'a mut Vec<TriggeredCast>,
}

impl<'a> HookEnv<'a> {
    pub fn reborrow(&mut self) -> HookEnv<'_> {
        HookEnv {
            now: self.now,
            rng: &mut *self.rng,
            triggered: &mut *self.triggered,
        }
    }
}

/// View handed to a hook while it runs
pub struct AuraContext<'a> {
    /// Aura whose hook is running
    pub aura: ActionId,
    pub character: &'a mut Character,
    pub(crate) env: HookEnv<'a>,
}

impl<'a> AuraContext<'a> {
    pub fn now(&self) -> Duration {
        self.env.now
    }

    pub fn rng(&mut self) -> &mut RandomStreams {
        self.env.rng
    }

    /// Bernoulli trial on a labeled stream
    pub fn chance(&mut self, label: &'static str, chance: f64) -> bool {
        self.env.rng.chance(label, chance)
    }

    pub fn add_aura(&mut self, aura: Aura) {
        self.character.add_aura(aura, &mut self.env.reborrow());
    }

    pub fn remove_aura(&mut self, id: AuraId) {
        self.character.remove_aura(id, &mut self.env.reborrow());
    }

    pub fn set_stacks(&mut self, id: AuraId, stacks: u32) {
        self.character.set_aura_stacks(id, stacks, &mut self.env.reborrow());
    }

    /// Restore resource to the owner, clamped to its maximum
    pub fn gain_resource(&mut self, amount: f64) -> f64 {
        self.character.gain_resource(amount, self.env.now)
    }

    /// Queue an off-GCD cast (e.g. a damage proc) against `target`
    pub fn trigger_cast(&mut self, cast: Cast, target: TargetId) {
        self.env.triggered.push(TriggeredCast { cast, target });
    }
}
