//! Combat participants driven by an agent
//!
//! A [`Character`] owns its stat sheet, resource pool, auras, cooldowns and
//! DoT slots as separate components and delegates to them explicitly.

mod resource;
mod stats;

pub use resource::ResourcePool;
pub use stats::{PseudoStats, StatSheet};

use crate::aura::{
    Aura, AuraChange, AuraContext, AuraEffect, AuraHooks, AuraId, AuraTracker, AuraUptime,
    CooldownId, CooldownTracker, HookEnv, RemovedAura,
};
use crate::combat::{Cast, DotTracker};
use crate::config::CombatConstants;
use crate::metrics::CharacterMetrics;
use crate::scheduler::ActionHandle;
use crate::target::TargetId;
use serde::{Deserialize, Serialize};
use stats_core::{Stat, StatDependency, Stats};
use std::fmt;
use std::time::Duration;

/// Index of a unit (player or pet) within a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub usize);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit {}", self.0)
    }
}

/// Weapon used by the auto-attack swing timer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub min_damage: f64,
    pub max_damage: f64,
    pub swing_speed_secs: f64,
    /// Share of attack power added per swing, per second of swing speed
    #[serde(default = "default_ap_coefficient")]
    pub attack_power_coefficient: f64,
}

fn default_ap_coefficient() -> f64 {
    1.0 / 14.0
}

impl Weapon {
    pub fn swing_speed(&self) -> Duration {
        Duration::from_secs_f64(self.swing_speed_secs)
    }
}

/// In-flight cast-time action
#[derive(Debug, Clone)]
pub struct Hardcast {
    pub cast: Cast,
    pub target: TargetId,
    pub expires: Duration,
}

/// Pending wait for regeneration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceWait {
    pub desired: f64,
    pub since: Duration,
}

/// Cooldown the GCD loop fires automatically whenever it is ready
#[derive(Debug, Clone)]
pub struct MajorCooldown {
    pub cast: Cast,
    pub target: TargetId,
}

/// Agility to armor, applied to every character
pub const ARMOR_PER_AGILITY: f64 = 2.0;
/// Intellect to maximum mana, applied to every character
pub const MANA_PER_INTELLECT: f64 = 15.0;

type AuraFactory = Box<dyn Fn() -> Aura>;

/// A combat participant
pub struct Character {
    pub id: UnitId,
    pub name: String,
    /// Set for pets; their damage is folded into the owner's totals
    pub owner: Option<UnitId>,
    pub pseudo: PseudoStats,
    pub weapon: Option<Weapon>,
    pub metrics: CharacterMetrics,

    stats: StatSheet,
    initial_pseudo: PseudoStats,
    resource: ResourcePool,
    auras: AuraTracker,
    cooldowns: CooldownTracker,
    permanent_auras: Vec<AuraFactory>,
    major_cooldowns: Vec<MajorCooldown>,

    pub(crate) dots: DotTracker,
    pub(crate) hardcast: Option<Hardcast>,
    pub(crate) gcd_action: Option<ActionHandle>,
    pub(crate) wait: Option<ResourceWait>,
    pub(crate) swing_action: Option<ActionHandle>,
}

impl Character {
    /// Create a character with the universal stat dependencies installed
    pub fn new(id: UnitId, name: impl Into<String>, base: Stats) -> Self {
        let mut stats = StatSheet::new(base);
        stats.add_dependency(StatDependency::linear(Stat::Agility, Stat::Armor, ARMOR_PER_AGILITY));
        stats.add_dependency(StatDependency::linear(Stat::Intellect, Stat::Mana, MANA_PER_INTELLECT));

        Character {
            id,
            name: name.into(),
            owner: None,
            pseudo: PseudoStats::default(),
            weapon: None,
            metrics: CharacterMetrics::new(),
            stats,
            initial_pseudo: PseudoStats::default(),
            resource: ResourcePool::default(),
            auras: AuraTracker::new(),
            cooldowns: CooldownTracker::new(),
            permanent_auras: Vec::new(),
            major_cooldowns: Vec::new(),
            dots: DotTracker::new(),
            hardcast: None,
            gcd_action: None,
            wait: None,
            swing_action: None,
        }
    }

    // Setup. Everything here happens before finalize.

    pub fn add_stats(&mut self, stats: Stats) {
        self.stats.add_base(stats);
    }

    pub fn add_stat_dependency(&mut self, dep: StatDependency) {
        self.stats.add_dependency(dep);
    }

    /// Register an aura re-created at the start of every iteration
    pub fn add_permanent_aura(&mut self, factory: impl Fn() -> Aura + 'static) {
        self.permanent_auras.push(Box::new(factory));
    }

    pub fn add_major_cooldown(&mut self, cast: Cast, target: TargetId) {
        self.major_cooldowns.push(MajorCooldown { cast, target });
    }

    /// Resolve stat dependencies and freeze the initial state
    pub fn finalize(&mut self) {
        self.stats.finalize();
        self.initial_pseudo = self.pseudo;
        let stats = self.stats.current();
        self.resource = ResourcePool::new(stats[Stat::Mana], mana_regen(&stats));
    }

    pub fn is_finalized(&self) -> bool {
        self.stats.is_finalized()
    }

    // Queries

    pub fn stats(&self) -> Stats {
        self.stats.current()
    }

    pub fn initial_stats(&self) -> Stats {
        self.stats.initial()
    }

    pub fn resource(&self) -> &ResourcePool {
        &self.resource
    }

    pub fn auras(&self) -> &AuraTracker {
        &self.auras
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn major_cooldowns(&self) -> &[MajorCooldown] {
        &self.major_cooldowns
    }

    pub fn is_hardcasting(&self) -> bool {
        self.hardcast.is_some()
    }

    pub fn hardcast(&self) -> Option<&Hardcast> {
        self.hardcast.as_ref()
    }

    pub fn is_waiting_for_resource(&self) -> bool {
        self.wait.is_some()
    }

    pub fn is_aura_active(&self, id: AuraId, now: Duration) -> bool {
        self.auras.is_active(id, now)
    }

    pub fn is_gcd_ready(&self, now: Duration) -> bool {
        self.cooldowns.is_ready(CooldownId::Gcd, now)
    }

    /// Spell haste as a speed multiplier (1.1 = 10% faster)
    pub fn spell_haste(&self, constants: &CombatConstants) -> f64 {
        let rating = self.stats.current()[Stat::SpellHasteRating];
        (1.0 + rating / constants.ratings.spell_haste_per_percent / 100.0) * self.pseudo.haste_multiplier
    }

    pub fn melee_haste(&self, constants: &CombatConstants) -> f64 {
        let rating = self.stats.current()[Stat::MeleeHasteRating];
        (1.0 + rating / constants.ratings.melee_haste_per_percent / 100.0) * self.pseudo.haste_multiplier
    }

    // Runtime state

    pub(crate) fn cooldowns_mut(&mut self) -> &mut CooldownTracker {
        &mut self.cooldowns
    }

    pub(crate) fn resource_mut(&mut self) -> &mut ResourcePool {
        &mut self.resource
    }

    /// Add resource at `now`; returns the amount actually gained
    pub fn gain_resource(&mut self, amount: f64, now: Duration) -> f64 {
        self.resource.advance(now);
        let gained = self.resource.gain(amount);
        self.metrics.iteration.resource_gained += gained;
        gained
    }

    /// Apply a runtime stat change and keep the resource pool in sync
    pub fn add_dynamic_stats(&mut self, delta: Stats, now: Duration) {
        self.stats.add_dynamic(delta);
        let stats = self.stats.current();
        self.resource.set_max(now, stats[Stat::Mana]);
        self.resource.set_rate(now, mana_regen(&stats));
    }

    /// Restore iteration-start state; permanent auras are re-added by the caller
    pub(crate) fn reset(&mut self) {
        self.stats.reset();
        self.pseudo = self.initial_pseudo;
        let stats = self.stats.current();
        self.resource = ResourcePool::new(stats[Stat::Mana], mana_regen(&stats));
        self.auras.reset();
        self.cooldowns.reset();
        self.dots.reset();
        self.hardcast = None;
        self.gcd_action = None;
        self.wait = None;
        self.swing_action = None;
        self.metrics.reset();
    }

    pub(crate) fn add_permanent_auras(&mut self, env: &mut HookEnv<'_>) {
        let auras: Vec<Aura> = self.permanent_auras.iter().map(|f| f()).collect();
        for aura in auras {
            self.add_aura(aura, env);
        }
    }

    /// Regenerate and expire auras up to `env.now`
    pub(crate) fn advance(&mut self, env: &mut HookEnv<'_>) {
        self.resource.advance(env.now);
        self.expire_auras(env);
    }

    pub(crate) fn expire_auras(&mut self, env: &mut HookEnv<'_>) {
        for slot in self.auras.advance(env.now) {
            if let Some(removed) = self.auras.expire(slot, env.now) {
                self.finish_removal(removed, env);
            }
        }
    }

    pub(crate) fn add_aura(&mut self, aura: Aura, env: &mut HookEnv<'_>) {
        self.expire_auras(env);
        let instant = aura.duration.is_zero();

        match self.auras.add(aura, env.now) {
            AuraChange::Gained { slot } => {
                self.apply_effect(self.auras.effect(slot), 0, 1, env.now);
                self.run_slot_hooks(slot, env, |hooks, ctx| hooks.on_gain(ctx));
                if instant {
                    if let Some(removed) = self.auras.expire(slot, env.now) {
                        self.finish_removal(removed, env);
                    }
                }
            }
            AuraChange::StacksChanged { slot, old, new } => {
                self.apply_effect(self.auras.effect(slot), old, new, env.now);
                self.run_slot_hooks(slot, env, |hooks, ctx| hooks.on_stacks_changed(ctx, old, new));
            }
            AuraChange::Refreshed { .. } | AuraChange::Rejected => {}
        }
    }

    pub(crate) fn remove_aura(&mut self, id: AuraId, env: &mut HookEnv<'_>) {
        if let Some(removed) = self.auras.remove(id, env.now) {
            self.finish_removal(removed, env);
        }
    }

    pub(crate) fn set_aura_stacks(&mut self, id: AuraId, stacks: u32, env: &mut HookEnv<'_>) {
        if stacks == 0 {
            self.remove_aura(id, env);
            return;
        }
        let Some((old, new)) = self.auras.set_stacks(id, stacks) else {
            return;
        };
        if old == new {
            return;
        }
        let Some(slot) = self.auras.slot_index(id) else {
            return;
        };
        self.apply_effect(self.auras.effect(slot), old, new, env.now);
        self.run_slot_hooks(slot, env, |hooks, ctx| hooks.on_stacks_changed(ctx, old, new));
    }

    fn apply_effect(&mut self, effect: AuraEffect, old: u32, new: u32, now: Duration) {
        if let AuraEffect::Stats(per_stack) = effect {
            let delta = new as f64 - old as f64;
            if delta != 0.0 {
                self.add_dynamic_stats(per_stack * delta, now);
            }
        }
    }

    fn finish_removal(&mut self, removed: RemovedAura, env: &mut HookEnv<'_>) {
        self.apply_effect(removed.effect, removed.stacks, 0, env.now);
        if let Some(mut hooks) = removed.hooks {
            let mut ctx = AuraContext {
                aura: removed.action,
                character: self,
                env: env.reborrow(),
            };
            hooks.on_expire(&mut ctx);
        }
    }

    fn run_slot_hooks(
        &mut self,
        slot: usize,
        env: &mut HookEnv<'_>,
        f: impl FnOnce(&mut dyn AuraHooks, &mut AuraContext<'_>),
    ) {
        let instance = self.auras.instance(slot);
        let Some(mut hooks) = self.auras.take_hooks(slot, instance) else {
            return;
        };
        let action = self.auras.action(slot);
        {
            let mut ctx = AuraContext {
                aura: action,
                character: &mut *self,
                env: env.reborrow(),
            };
            f(hooks.as_mut(), &mut ctx);
        }
        self.auras.restore_hooks(slot, instance, hooks);
    }

    /// Run a hook on every active aura that has hooks, in gain order
    pub(crate) fn fire_hooks(
        &mut self,
        env: &mut HookEnv<'_>,
        mut f: impl FnMut(&mut dyn AuraHooks, &mut AuraContext<'_>),
    ) {
        for (slot, instance) in self.auras.hooked() {
            let Some(mut hooks) = self.auras.take_hooks(slot, instance) else {
                continue;
            };
            let action = self.auras.action(slot);
            {
                let mut ctx = AuraContext {
                    aura: action,
                    character: &mut *self,
                    env: env.reborrow(),
                };
                f(hooks.as_mut(), &mut ctx);
            }
            self.auras.restore_hooks(slot, instance, hooks);
        }
    }

    /// Close per-iteration windows at the end of the encounter
    pub(crate) fn close_iteration(&mut self, end: Duration) {
        self.resource.advance(end);
        self.auras.close_uptime(end);
        self.dots.close_uptime(end);
        if let Some(wait) = self.wait.take() {
            self.metrics.mark_oom(end.saturating_sub(wait.since));
        }
        let uptimes: Vec<_> = self.auras.uptimes().collect();
        for uptime in &uptimes {
            self.metrics.add_aura_uptime(uptime);
        }
        let dot_uptimes: Vec<_> = self
            .dots
            .iter()
            .filter(|d| d.applications > 0)
            .map(|d| {
                let uptime = AuraUptime {
                    action: d.action,
                    uptime: d.uptime,
                    gains: d.applications,
                };
                (d.target, uptime)
            })
            .collect();
        for (target, uptime) in &dot_uptimes {
            self.metrics.add_dot_uptime(*target, uptime);
        }
    }
}

/// Regeneration per second from MP5
fn mana_regen(stats: &Stats) -> f64 {
    stats[Stat::Mp5] / 5.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aura::{ReapplyPolicy, TriggeredCast};
    use crate::rng::RandomStreams;
    use stats_core::ActionId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn character() -> Character {
        let mut c = Character::new(UnitId(0), "Tester", Stats::single(Stat::Intellect, 100.0));
        c.add_stats(Stats::single(Stat::Agility, 50.0));
        c.finalize();
        c
    }

    fn env<'a>(now: f64, rng: &'a mut RandomStreams, triggered: &'a mut Vec<TriggeredCast>) -> HookEnv<'a> {
        HookEnv {
            now: Duration::from_secs_f64(now),
            rng,
            triggered,
        }
    }

    #[derive(Clone, Default)]
    struct Log(Rc<RefCell<Vec<String>>>);

    impl Log {
        fn push(&self, s: impl Into<String>) {
            self.0.borrow_mut().push(s.into());
        }
        fn entries(&self) -> Vec<String> {
            self.0.borrow().clone()
        }
    }

    struct Recorder(Log);

    impl AuraHooks for Recorder {
        fn on_gain(&mut self, ctx: &mut AuraContext<'_>) {
            self.0.push(format!("gain@{}", ctx.now().as_secs_f64()));
        }
        fn on_expire(&mut self, ctx: &mut AuraContext<'_>) {
            self.0.push(format!("expire@{}", ctx.now().as_secs_f64()));
        }
        fn on_stacks_changed(&mut self, _ctx: &mut AuraContext<'_>, old: u32, new: u32) {
            self.0.push(format!("stacks {}->{}", old, new));
        }
    }

    #[test]
    fn test_universal_dependencies() {
        let c = character();
        assert!((c.stats()[Stat::Mana] - 1500.0).abs() < 1e-9);
        assert!((c.stats()[Stat::Armor] - 100.0).abs() < 1e-9);
        assert!((c.resource().current() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_stat_aura_applies_and_reverts() {
        let mut c = character();
        let mut rng = RandomStreams::new(1);
        let mut triggered = Vec::new();
        let aura = Aura::new(ActionId::spell(1), "Int buff", Duration::from_secs(10))
            .with_stats(Stats::single(Stat::Intellect, 10.0));

        c.add_aura(aura, &mut env(0.0, &mut rng, &mut triggered));
        assert!((c.stats()[Stat::Mana] - 1650.0).abs() < 1e-9);

        c.advance(&mut env(10.0, &mut rng, &mut triggered));
        assert!((c.stats()[Stat::Mana] - 1500.0).abs() < 1e-9);
        assert_eq!(c.stats(), c.initial_stats());
    }

    #[test]
    fn test_zero_duration_aura_fires_both_hooks() {
        let mut c = character();
        let mut rng = RandomStreams::new(1);
        let mut triggered = Vec::new();
        let log = Log::default();
        let aura = Aura::new(ActionId::spell(2), "Flash", Duration::ZERO).with_hooks(Recorder(log.clone()));

        c.add_aura(aura, &mut env(4.0, &mut rng, &mut triggered));
        assert_eq!(log.entries(), vec!["gain@4", "expire@4"]);
        assert!(!c.is_aura_active(ActionId::spell(2).key(), Duration::from_secs(4)));
    }

    #[test]
    fn test_stack_to_zero_expires_once() {
        let mut c = character();
        let mut rng = RandomStreams::new(1);
        let mut triggered = Vec::new();
        let log = Log::default();
        let id = ActionId::spell(3);
        let make = |log: &Log| {
            Aura::new(id, "Stacks", Duration::from_secs(20))
                .with_policy(ReapplyPolicy::Stack { max_stacks: 3 })
                .with_stats(Stats::single(Stat::SpellPower, 10.0))
                .with_hooks(Recorder(log.clone()))
        };

        c.add_aura(make(&log), &mut env(0.0, &mut rng, &mut triggered));
        c.add_aura(make(&log), &mut env(1.0, &mut rng, &mut triggered));
        assert!((c.stats()[Stat::SpellPower] - 20.0).abs() < 1e-9);

        c.set_aura_stacks(id.key(), 0, &mut env(2.0, &mut rng, &mut triggered));
        c.set_aura_stacks(id.key(), 0, &mut env(2.0, &mut rng, &mut triggered));
        c.advance(&mut env(30.0, &mut rng, &mut triggered));

        assert_eq!(log.entries(), vec!["gain@0", "stacks 1->2", "expire@2"]);
        assert_eq!(c.stats()[Stat::SpellPower], 0.0);
    }

    #[test]
    fn test_hook_can_add_aura() {
        struct Chain;
        impl AuraHooks for Chain {
            fn on_gain(&mut self, ctx: &mut AuraContext<'_>) {
                ctx.add_aura(Aura::new(ActionId::spell(11), "Child", Duration::from_secs(5)));
            }
        }

        let mut c = character();
        let mut rng = RandomStreams::new(1);
        let mut triggered = Vec::new();
        c.add_aura(
            Aura::new(ActionId::spell(10), "Parent", Duration::from_secs(5)).with_hooks(Chain),
            &mut env(0.0, &mut rng, &mut triggered),
        );
        assert!(c.is_aura_active(ActionId::spell(11).key(), Duration::from_secs(1)));
        // The parent's hooks went back in place.
        assert_eq!(c.auras().hooked().len(), 1);
    }

    #[test]
    fn test_reset_restores_state() {
        let mut c = character();
        let mut rng = RandomStreams::new(1);
        let mut triggered = Vec::new();
        c.add_permanent_aura(|| {
            Aura::permanent(ActionId::item(5), "Trinket").with_stats(Stats::single(Stat::SpellPower, 40.0))
        });
        c.resource_mut().spend(500.0);
        c.pseudo.damage_dealt_multiplier = 2.0;

        c.reset();
        c.add_permanent_auras(&mut env(0.0, &mut rng, &mut triggered));
        assert!((c.resource().current() - 1500.0).abs() < 1e-9);
        assert_eq!(c.pseudo.damage_dealt_multiplier, 1.0);
        assert!((c.stats()[Stat::SpellPower] - 40.0).abs() < 1e-9);

        c.close_iteration(Duration::from_secs(60));
        let aura = c.metrics.auras().next().unwrap();
        assert_eq!(aura.action, ActionId::item(5));
    }
}
