//! Per-iteration simulation state
//!
//! [`Sim`] is what agents and callbacks see: the clock, the labeled random
//! streams, every unit and target, and the operations that schedule future
//! work. The event loop that drives it lives in [`crate::simulation`].

use crate::aura::{Aura, AuraId, CooldownId, HookEnv, TriggeredCast};
use crate::character::{Character, ResourceWait, UnitId};
use crate::config::CombatConstants;
use crate::rng::RandomStreams;
use crate::scheduler::{ActionHandle, ActionKind, Priority, Scheduler};
use crate::target::{Target, TargetId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Mutable world of one running iteration
pub struct Sim {
    pub(crate) scheduler: Scheduler,
    pub(crate) rng: RandomStreams,
    pub(crate) constants: Arc<CombatConstants>,
    pub(crate) units: Vec<Character>,
    pub(crate) targets: Vec<Target>,
    /// Casts queued by hooks during the current event
    pub(crate) triggered: Vec<TriggeredCast>,
    pub(crate) duration: Duration,
    pub(crate) iteration: u32,
    pub(crate) log: Option<Vec<String>>,
}

impl Sim {
    pub(crate) fn new(
        seed: u64,
        duration: Duration,
        constants: Arc<CombatConstants>,
        units: Vec<Character>,
        targets: Vec<Target>,
    ) -> Self {
        Sim {
            scheduler: Scheduler::new(),
            rng: RandomStreams::new(seed),
            constants,
            units,
            targets,
            triggered: Vec::new(),
            duration,
            iteration: 0,
            log: None,
        }
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time left in the encounter
    pub fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.now())
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn constants(&self) -> &CombatConstants {
        &self.constants
    }

    pub fn unit(&self, id: UnitId) -> &Character {
        &self.units[id.0]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut Character {
        &mut self.units[id.0]
    }

    pub fn units(&self) -> &[Character] {
        &self.units
    }

    pub fn target(&self, id: TargetId) -> &Target {
        &self.targets[id.0]
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn rng(&mut self) -> &mut RandomStreams {
        &mut self.rng
    }

    pub fn is_logging(&self) -> bool {
        self.log.is_some()
    }

    /// Append a line to the combat log, if this iteration keeps one
    pub fn log(&mut self, unit: UnitId, message: impl fmt::Display) {
        if let Some(log) = self.log.as_mut() {
            let name = &self.units[unit.0].name;
            log.push(format!(
                "[{:>8.3}] {}: {}",
                self.scheduler.now().as_secs_f64(),
                name,
                message
            ));
        }
    }

    /// Run `f` at `at`
    pub fn schedule(&mut self, at: Duration, f: impl FnOnce(&mut Sim) + 'static) -> ActionHandle {
        self.scheduler
            .schedule(at, Priority::Default, ActionKind::Callback(Box::new(f)))
    }

    pub fn cancel(&mut self, handle: ActionHandle) {
        self.scheduler.cancel(handle);
    }

    // Auras

    pub fn add_aura(&mut self, unit: UnitId, aura: Aura) {
        let mut env = HookEnv {
            now: self.scheduler.now(),
            rng: &mut self.rng,
            triggered: &mut self.triggered,
        };
        self.units[unit.0].add_aura(aura, &mut env);
        self.resolve_triggered(unit);
    }

    pub fn remove_aura(&mut self, unit: UnitId, id: AuraId) {
        let mut env = HookEnv {
            now: self.scheduler.now(),
            rng: &mut self.rng,
            triggered: &mut self.triggered,
        };
        self.units[unit.0].remove_aura(id, &mut env);
        self.resolve_triggered(unit);
    }

    /// Set an aura's stack count; zero removes it
    pub fn set_aura_stacks(&mut self, unit: UnitId, id: AuraId, stacks: u32) {
        let mut env = HookEnv {
            now: self.scheduler.now(),
            rng: &mut self.rng,
            triggered: &mut self.triggered,
        };
        self.units[unit.0].set_aura_stacks(id, stacks, &mut env);
        self.resolve_triggered(unit);
    }

    /// Add a data-only debuff to a target
    pub fn add_target_aura(&mut self, target: TargetId, aura: Aura) {
        let now = self.now();
        let target = &mut self.targets[target.0];
        target.advance(now);
        target.auras.add(aura, now);
    }

    pub fn gain_resource(&mut self, unit: UnitId, amount: f64) -> f64 {
        let now = self.now();
        self.units[unit.0].gain_resource(amount, now)
    }

    // GCD loop

    /// Move a unit's next GCD event to `at`, cancelling the pending one
    pub fn set_gcd_timer(&mut self, unit: UnitId, at: Duration) {
        let at = at.max(self.now());
        let character = &mut self.units[unit.0];
        if let Some(handle) = character.gcd_action.take() {
            self.scheduler.cancel(handle);
        }
        character.cooldowns_mut().set(CooldownId::Gcd, at);
        character.gcd_action = Some(self.scheduler.schedule(at, Priority::Gcd, ActionKind::Gcd(unit)));
    }

    /// Do nothing until `at`
    pub fn wait_until(&mut self, unit: UnitId, at: Duration) {
        self.set_gcd_timer(unit, at);
    }

    /// Sleep until the resource pool reaches `desired`
    ///
    /// The wake time is computed once from the regeneration rate. A unit
    /// that can never get there stays idle for the rest of the iteration.
    pub fn wait_for_resource(&mut self, unit: UnitId, desired: f64) {
        let now = self.now();
        let character = &mut self.units[unit.0];
        character.resource_mut().advance(now);
        let since = character.wait.map_or(now, |w| w.since);
        character.wait = Some(ResourceWait { desired, since });

        match character.resource().time_until(desired) {
            Some(delay) => {
                trace!(unit = unit.0, desired, delay = ?delay, "waiting for resource");
                self.set_gcd_timer(unit, now + delay);
            }
            None => {
                trace!(unit = unit.0, desired, "resource out of reach, idling");
                if let Some(handle) = character.gcd_action.take() {
                    self.scheduler.cancel(handle);
                }
            }
        }
    }

    /// Regenerate, expire auras and finish due hardcasts for every unit
    pub(crate) fn advance_units(&mut self) {
        let now = self.now();
        for i in 0..self.units.len() {
            let unit = UnitId(i);
            {
                let mut env = HookEnv {
                    now,
                    rng: &mut self.rng,
                    triggered: &mut self.triggered,
                };
                self.units[i].advance(&mut env);
            }

            let due = self.units[i]
                .hardcast
                .as_ref()
                .is_some_and(|h| h.expires <= now);
            if due {
                if let Some(hardcast) = self.units[i].hardcast.take() {
                    self.complete_cast(unit, hardcast.cast, hardcast.target);
                }
            }
            self.resolve_triggered(unit);
        }
        for target in &mut self.targets {
            target.advance(now);
        }
    }
}
