//! Simulation setup and the per-iteration event loop

use crate::agent::Agent;
use crate::aura::HookEnv;
use crate::character::{Character, UnitId};
use crate::config::CombatConstants;
use crate::error::SimError;
use crate::metrics::{DistributionMetrics, TargetMetrics};
use crate::registry::{Registry, UnitSetup};
use crate::request::SimRequest;
use crate::result::{Batch, TargetBatch, UnitBatch};
use crate::scheduler::{ActionKind, Priority};
use crate::sim::Sim;
use crate::target::{Target, TargetId};
use stats_core::Stats;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// A fully built encounter that can run any number of iterations
///
/// Owns every unit, target and agent. Not `Send`: each worker builds its own.
pub struct Simulation {
    sim: Sim,
    agents: Vec<Option<Box<dyn Agent>>>,
    debug: bool,
    raid: DistributionMetrics,
    target_metrics: Vec<TargetMetrics>,
    debug_log: Option<String>,
    completed: u32,
}

impl Simulation {
    /// Build units, pets and targets from a request
    pub fn new(request: &SimRequest, registry: &Registry, constants: Arc<CombatConstants>) -> Result<Self, SimError> {
        request.validate()?;
        constants.validate()?;
        let duration = request.encounter.duration()?;

        let mut units: Vec<Character> = Vec::new();
        let mut agents: Vec<Option<Box<dyn Agent>>> = Vec::new();

        for player in &request.players {
            let id = UnitId(units.len());

            // Step 1: Base, buff and item stats
            let mut character = Character::new(id, player.name.clone(), Stats::from_map(&player.base_stats));
            character.add_stats(Stats::from_map(&player.buffs));
            character.weapon = player.weapon;
            for item in &player.equipment {
                character.add_stats(Stats::from_map(&item.stats));
                registry.apply_item_effect(item.id, &mut character);
                for gem in &item.gems {
                    registry.apply_item_effect(*gem, &mut character);
                }
                if let Some(enchant) = item.enchant {
                    registry.apply_item_effect(enchant, &mut character);
                }
            }

            // Step 2: Spec factory (talents, rotation, pets)
            let mut setup = UnitSetup::new(character, player);
            let agent = registry.build_agent(&player.spec, &mut setup)?;
            let (mut character, pets) = setup.into_parts();

            // Step 3: Freeze initial stats
            character.finalize();
            units.push(character);
            agents.push(Some(agent));
            for pet in pets {
                let mut character = pet.character;
                character.finalize();
                units.push(character);
                agents.push(Some(pet.agent));
            }
        }

        let targets: Vec<Target> = request
            .encounter
            .resolved_targets()
            .into_iter()
            .enumerate()
            .map(|(i, config)| Target::new(TargetId(i), config))
            .collect();
        let target_count = targets.len();

        debug!(
            units = units.len(),
            targets = target_count,
            "simulation built"
        );

        let mut simulation = Simulation {
            sim: Sim::new(request.options.seed, duration, constants, units, targets),
            agents,
            debug: request.options.debug,
            raid: DistributionMetrics::new(),
            target_metrics: vec![TargetMetrics::new(); target_count],
            debug_log: None,
            completed: 0,
        };
        for agent in simulation.agents.iter_mut().flatten() {
            agent.init(&mut simulation.sim);
        }
        Ok(simulation)
    }

    pub fn sim(&self) -> &Sim {
        &self.sim
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Run the iterations in `range`, stopping early if `cancel` is raised
    ///
    /// Cancellation is only checked between iterations. Returns the number
    /// of iterations completed.
    pub fn run(&mut self, range: Range<u32>, cancel: Option<&AtomicBool>) -> u32 {
        let mut done = 0;
        for iteration in range {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                debug!(iteration, "cancelled");
                break;
            }
            self.run_iteration(iteration);
            done += 1;
        }
        done
    }

    /// Run one iteration and fold its results into the aggregates
    pub fn run_iteration(&mut self, iteration: u32) {
        self.reset(iteration);

        let end = self.sim.duration;
        while let Some((_, kind)) = self.sim.scheduler.pop_next(end) {
            self.sim.advance_units();
            self.dispatch(kind);
        }
        self.sim.scheduler.advance_to(end);

        self.finish_iteration();
    }

    fn reset(&mut self, iteration: u32) {
        let sim = &mut self.sim;
        sim.scheduler.clear();
        sim.rng.reseed(iteration);
        sim.triggered.clear();
        sim.iteration = iteration;
        sim.log = (self.debug && iteration == 0).then(Vec::new);

        for target in &mut sim.targets {
            target.reset();
        }
        for i in 0..sim.units.len() {
            sim.units[i].reset();
            let mut env = HookEnv {
                now: Duration::ZERO,
                rng: &mut sim.rng,
                triggered: &mut sim.triggered,
            };
            sim.units[i].add_permanent_auras(&mut env);
            sim.resolve_triggered(UnitId(i));
        }

        for agent in self.agents.iter_mut().flatten() {
            agent.reset(&mut self.sim);
        }

        let sim = &mut self.sim;
        let tick = sim.constants.resource.tick_interval();
        for i in 0..sim.units.len() {
            let unit = UnitId(i);
            if self.agents[i].is_some() {
                sim.set_gcd_timer(unit, Duration::ZERO);
                sim.scheduler
                    .schedule(tick, Priority::Default, ActionKind::ResourceTick(unit));
            }
            if sim.units[i].weapon.is_some() {
                let handle = sim
                    .scheduler
                    .schedule(Duration::ZERO, Priority::Default, ActionKind::AutoAttack(unit));
                sim.units[i].swing_action = Some(handle);
            }
        }
    }

    fn dispatch(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Gcd(unit) => self.on_gcd(unit),
            // Completed while advancing units.
            ActionKind::HardcastComplete(_) => {}
            ActionKind::ResourceTick(unit) => {
                let next = self.sim.now() + self.sim.constants.resource.tick_interval();
                self.sim
                    .scheduler
                    .schedule(next, Priority::Default, ActionKind::ResourceTick(unit));
                if let Some(agent) = self.agents[unit.0].as_mut() {
                    agent.on_resource_tick(&mut self.sim);
                }
            }
            ActionKind::AutoAttack(unit) => {
                self.sim.units[unit.0].swing_action = None;
                if let Some(outcome) = self.sim.swing(unit) {
                    if let Some(agent) = self.agents[unit.0].as_mut() {
                        agent.on_auto_attack(&mut self.sim, outcome);
                    }
                }
            }
            ActionKind::DotTick { unit, slot } => self.sim.dot_tick(unit, slot),
            ActionKind::Callback(f) => f(&mut self.sim),
        }
    }

    /// GCD loop: close a finished wait, fire major cooldowns, then ask the agent
    fn on_gcd(&mut self, unit: UnitId) {
        let now = self.sim.now();
        let character = &mut self.sim.units[unit.0];
        character.gcd_action = None;

        if let Some(hardcast) = character.hardcast.as_ref() {
            let at = hardcast.expires;
            self.sim.set_gcd_timer(unit, at);
            return;
        }

        if let Some(wait) = character.wait {
            character.resource_mut().advance(now);
            if !character.resource().can_afford(wait.desired) {
                self.sim.wait_for_resource(unit, wait.desired);
                return;
            }
            character.wait = None;
            character.metrics.mark_oom(now.saturating_sub(wait.since));
            trace!(unit = unit.0, waited = ?(now - wait.since), "resource wait over");
        }

        let cooldowns: Vec<_> = self.sim.units[unit.0].major_cooldowns().to_vec();
        for major in &cooldowns {
            self.sim.cast(unit, &major.cast, major.target);
        }

        let character = &self.sim.units[unit.0];
        if !character.is_gcd_ready(now) || character.is_hardcasting() || character.gcd_action.is_some() {
            return;
        }
        if let Some(agent) = self.agents[unit.0].as_mut() {
            agent.on_gcd_ready(&mut self.sim);
        }

        let character = &self.sim.units[unit.0];
        if character.gcd_action.is_none() && !character.is_hardcasting() && !character.is_waiting_for_resource() {
            trace!(unit = unit.0, at = ?now, "agent left the GCD loop idle");
        }
    }

    fn finish_iteration(&mut self) {
        let sim = &mut self.sim;
        let end = sim.duration;
        let secs = end.as_secs_f64();

        for unit in &mut sim.units {
            unit.close_iteration(end);
        }

        // Pets aggregate first, then feed their totals to the owner.
        for i in 0..sim.units.len() {
            if let Some(owner) = sim.units[i].owner {
                sim.units[i].metrics.done_iteration(secs);
                let (head, tail) = sim.units.split_at_mut(i);
                head[owner.0].metrics.add_final_pet_metrics(&tail[0].metrics);
            }
        }

        self.raid.total = sim
            .units
            .iter()
            .filter(|u| u.owner.is_none())
            .map(|u| u.metrics.dps.total)
            .sum();
        for unit in sim.units.iter_mut().filter(|u| u.owner.is_none()) {
            unit.metrics.done_iteration(secs);
        }
        self.raid.done_iteration(secs);
        self.raid.reset();

        for (metrics, target) in self.target_metrics.iter_mut().zip(&mut sim.targets) {
            target.close_iteration(end);
            metrics.add_iteration(target.damage_taken, target.auras.uptimes());
        }

        if let Some(log) = sim.log.take() {
            self.debug_log = Some(log.join("\n"));
        }
        self.completed += 1;
        trace!(iteration = sim.iteration, "iteration done");
    }

    /// Aggregates of every iteration run so far
    pub(crate) fn batch(&self) -> Batch {
        Batch {
            iterations: self.completed,
            duration_secs: self.sim.duration.as_secs_f64(),
            raid: self.raid.clone(),
            units: self
                .sim
                .units
                .iter()
                .map(|u| UnitBatch {
                    name: u.name.clone(),
                    owner: u.owner,
                    metrics: u.metrics.clone(),
                })
                .collect(),
            targets: self
                .sim
                .targets
                .iter()
                .zip(&self.target_metrics)
                .map(|(t, metrics)| TargetBatch {
                    name: t.name().to_string(),
                    metrics: metrics.clone(),
                })
                .collect(),
            debug_log: self.debug_log.clone(),
        }
    }
}
