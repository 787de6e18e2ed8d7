//! Cast pipeline
//!
//! Attempt → before-cast hooks → cost → GCD/hardcast → completion. Completion
//! rolls each target, applies damage and threat, runs hit hooks, then lands
//! DoTs and debuffs. Casts queued by hooks resolve once the event is done.

use super::cast::{Cast, CastAttempt};
use super::damage::{apply_aoe_cap, Mitigation};
use super::dot::{DotRefresh, DotTarget};
use super::outcome::{AttackTable, HitOutcome, HitTable};
use super::HitResult;
use crate::aura::{AuraContext, AuraHooks, CooldownId, HookEnv, TriggeredCast};
use crate::character::{Hardcast, UnitId};
use crate::scheduler::{ActionKind, Priority};
use crate::sim::Sim;
use crate::target::TargetId;
use stats_core::{ActionId, OtherAction, SpellSchool, Stat};
use std::time::Duration;

/// Rolled outcome and final damage against one target
struct Landing {
    target: TargetId,
    outcome: HitOutcome,
    damage: f64,
}

fn school_of(cast: &Cast) -> SpellSchool {
    match cast.school {
        Some(school) => school,
        None => panic!("Cast of {} has no school", cast.action),
    }
}

impl Sim {
    /// Attempt a cast for `unit` against `target`
    ///
    /// Negative results are returned for the rotation to act on. Casting an
    /// empty action or one without a school is a configuration bug and panics.
    pub fn cast(&mut self, unit: UnitId, cast: &Cast, target: TargetId) -> CastAttempt {
        let attempt = self.begin_cast(unit, cast, target);
        self.resolve_triggered(unit);
        attempt
    }

    fn begin_cast(&mut self, unit: UnitId, cast: &Cast, target: TargetId) -> CastAttempt {
        if cast.action.is_empty() {
            panic!("{} cast an action with no identity", self.units[unit.0].name);
        }
        school_of(cast);
        if target.0 >= self.targets.len() {
            return CastAttempt::NoTarget;
        }

        let now = self.now();
        let cooldown = CooldownId::Action(cast.action.key());
        let character = &self.units[unit.0];
        if !character.cooldowns().is_ready(cooldown, now) {
            return CastAttempt::OnCooldown {
                ready_at: character.cooldowns().ready_at(cooldown),
            };
        }
        if cast.gcd.is_some() && !character.is_gcd_ready(now) {
            return CastAttempt::OnCooldown {
                ready_at: character.cooldowns().ready_at(CooldownId::Gcd),
            };
        }
        if !cast.cast_time.is_zero() && character.is_hardcasting() {
            panic!("Hardcast already in use by {}", character.name);
        }

        let mut cast = cast.clone();
        self.fire_unit_hooks(unit, |hooks, ctx| hooks.on_before_cast(ctx, &mut cast));

        let character = &mut self.units[unit.0];
        let cost = cast.cost * character.pseudo.cost_multiplier;
        if cost > 0.0 {
            character.resource_mut().advance(now);
            if !character.resource_mut().spend(cost) {
                return CastAttempt::InsufficientResource { needed: cost };
            }
            character.metrics.iteration.resource_spent += cost;
        }

        if let Some(length) = cast.cooldown {
            character.cooldowns_mut().start(cooldown, now, length);
        }

        let haste = if cast.table.is_melee() {
            character.melee_haste(&self.constants)
        } else {
            character.spell_haste(&self.constants)
        };
        let cast_time = cast.cast_time.div_f64(haste);

        if let Some(gcd) = cast.gcd {
            // Melee GCDs are not hasted; spell GCDs stop at the floor.
            let gcd = if cast.table.is_melee() {
                gcd
            } else {
                gcd.div_f64(haste).max(self.constants.resource.min_gcd().min(gcd))
            };
            self.set_gcd_timer(unit, now + gcd.max(cast_time));
        }

        if !cast_time.is_zero() {
            let expires = now + cast_time;
            if self.is_logging() {
                self.log(unit, format_args!("Started casting {} ({:.3}s)", cast.action, cast_time.as_secs_f64()));
            }
            self.units[unit.0].hardcast = Some(Hardcast {
                cast,
                target,
                expires,
            });
            self.scheduler
                .schedule(expires, Priority::Default, ActionKind::HardcastComplete(unit));
            return CastAttempt::Started;
        }

        self.complete_cast(unit, cast, target);
        CastAttempt::Completed
    }

    /// Resolve a cast whose cost and timers have already been handled
    pub(crate) fn complete_cast(&mut self, unit: UnitId, cast: Cast, target: TargetId) {
        let school = school_of(&cast);
        let is_melee = cast.table.is_melee();

        self.units[unit.0].metrics.add_cast(cast.action, is_melee);
        self.fire_unit_hooks(unit, |hooks, ctx| hooks.on_cast_complete(ctx, &cast));
        if self.is_logging() {
            self.log(unit, format_args!("Completed cast {}", cast.action));
        }

        let targets: Vec<TargetId> = if cast.area {
            (0..self.targets.len()).map(TargetId).collect()
        } else {
            vec![target]
        };

        // Ground effects without direct damage land unconditionally.
        let rolls = !cast.area || cast.damage.is_some();
        let landings = if rolls {
            self.roll_landings(unit, &cast, school, &targets)
        } else {
            targets
                .iter()
                .map(|&target| Landing {
                    target,
                    outcome: HitOutcome::Hit,
                    damage: 0.0,
                })
                .collect()
        };

        if rolls {
            for landing in &landings {
                self.record_hit(unit, &cast, landing);
            }
        }

        let landed: Vec<TargetId> = landings
            .iter()
            .filter(|l| l.outcome.landed())
            .map(|l| l.target)
            .collect();

        if cast.dot.is_some() {
            if cast.area {
                if !landed.is_empty() {
                    self.apply_dot(unit, &cast, school, DotTarget::Area);
                }
            } else {
                for &t in &landed {
                    self.apply_dot(unit, &cast, school, DotTarget::Single(t));
                }
            }
        }

        if let Some(debuff) = &cast.debuff {
            for &t in &landed {
                self.add_target_aura(t, debuff.to_aura());
            }
        }
    }

    fn roll_landings(&mut self, unit: UnitId, cast: &Cast, school: SpellSchool, targets: &[TargetId]) -> Vec<Landing> {
        let now = self.now();
        let character = &self.units[unit.0];
        let stats = character.stats();
        let pseudo = character.pseudo;

        let mut landings = Vec::with_capacity(targets.len());
        for &target_id in targets {
            let target = &self.targets[target_id.0];
            let table = match cast.table {
                AttackTable::Spell => HitTable::spell(&stats, &pseudo, &target.config, &self.constants, cast.bonus_crit_chance),
                AttackTable::Melee => HitTable::melee(&stats, &pseudo, &target.config, &self.constants, false, cast.bonus_crit_chance),
                AttackTable::MeleeWhite => HitTable::melee(&stats, &pseudo, &target.config, &self.constants, true, cast.bonus_crit_chance),
            };
            let outcome = table.roll(self.rng.next_f64(cast.table.rng_label()));

            let damage = match cast.damage {
                Some(input) if outcome.landed() => {
                    let base = input.roll(&stats, school, &mut self.rng);
                    let raw = cast.modifiers.apply(base) * pseudo.damage_dealt_multiplier;
                    let mitigation = Mitigation {
                        school,
                        table: cast.table,
                        target: &target.config,
                        taken_multiplier: target.damage_taken_multiplier(now),
                        constants: &self.constants,
                    };
                    mitigation.apply(raw, outcome, &pseudo)
                }
                _ => 0.0,
            };
            landings.push(Landing {
                target: target_id,
                outcome,
                damage,
            });
        }

        if let Some(cap) = cast.aoe_cap {
            let mut amounts: Vec<f64> = landings.iter().map(|l| l.damage).collect();
            apply_aoe_cap(&mut amounts, cap);
            for (landing, amount) in landings.iter_mut().zip(amounts) {
                landing.damage = amount;
            }
        }
        landings
    }

    fn record_hit(&mut self, unit: UnitId, cast: &Cast, landing: &Landing) {
        let threat_multiplier = cast.threat_multiplier * self.units[unit.0].pseudo.threat_multiplier;
        let hit = HitResult {
            action: cast.action,
            target: landing.target,
            outcome: landing.outcome,
            damage: landing.damage,
            threat: landing.damage * threat_multiplier,
            periodic: false,
        };
        self.targets[landing.target.0].damage_taken += hit.damage;
        self.units[unit.0].metrics.add_hit(&hit, cast.table.is_melee());

        if self.is_logging() {
            self.log(unit, format_args!("{} {} {} for {:.2}", cast.action, hit.outcome, hit.target, hit.damage));
        }

        if cast.table.is_melee() {
            self.fire_unit_hooks(unit, |hooks, ctx| hooks.on_melee_attack(ctx, &hit));
        } else {
            self.fire_unit_hooks(unit, |hooks, ctx| hooks.on_spell_hit(ctx, &hit));
        }
    }

    /// Start, extend or restart a DoT slot
    fn apply_dot(&mut self, unit: UnitId, cast: &Cast, school: SpellSchool, dot_target: DotTarget) {
        let Some(dot) = cast.dot else {
            return;
        };
        let now = self.now();
        let character = &self.units[unit.0];
        let stats = character.stats();
        let pseudo = character.pseudo;
        let tick_damage =
            cast.modifiers.apply(dot.tick_damage.roll(&stats, school, &mut self.rng)) * pseudo.damage_dealt_multiplier;

        let character = &mut self.units[unit.0];
        let index = character.dots.slot_for(cast.action, dot_target, school);
        let Some(slot) = character.dots.get_mut(index) else {
            return;
        };

        if slot.active {
            match dot.refresh {
                DotRefresh::Extend => {
                    slot.ticks_left = dot.ticks;
                    slot.tick_damage = tick_damage;
                    return;
                }
                DotRefresh::Restart => {
                    if let Some(handle) = slot.next_tick.take() {
                        self.scheduler.cancel(handle);
                    }
                    slot.close_uptime(now);
                }
            }
        }

        slot.active = true;
        slot.ticks_left = dot.ticks;
        slot.tick_length = dot.tick_length;
        slot.tick_damage = tick_damage;
        slot.threat_multiplier = cast.threat_multiplier * pseudo.threat_multiplier;
        slot.aoe_cap = cast.aoe_cap;
        slot.uptime_from = now;
        slot.applications += 1;
        slot.next_tick = Some(self.scheduler.schedule(
            now + dot.tick_length,
            Priority::Default,
            ActionKind::DotTick { unit, slot: index },
        ));
    }

    /// One tick wave of a DoT slot
    pub(crate) fn dot_tick(&mut self, unit: UnitId, index: usize) {
        let now = self.now();
        let Some(slot) = self.units[unit.0].dots.get(index) else {
            return;
        };
        if !slot.active || slot.ticks_left == 0 {
            return;
        }
        let action = slot.action;
        let per_tick = slot.tick_damage;
        let threat_multiplier = slot.threat_multiplier;
        let aoe_cap = slot.aoe_cap;
        let targets: Vec<TargetId> = match slot.target {
            DotTarget::Single(t) => vec![t],
            DotTarget::Area => (0..self.targets.len()).map(TargetId).collect(),
        };

        let mut amounts: Vec<f64> = targets
            .iter()
            .map(|t| per_tick * self.targets[t.0].damage_taken_multiplier(now))
            .collect();
        if let Some(cap) = aoe_cap {
            apply_aoe_cap(&mut amounts, cap);
        }

        for (&target, damage) in targets.iter().zip(amounts) {
            let tick = HitResult {
                action,
                target,
                outcome: HitOutcome::Hit,
                damage,
                threat: damage * threat_multiplier,
                periodic: true,
            };
            self.targets[target.0].damage_taken += damage;
            self.units[unit.0].metrics.add_hit(&tick, false);
            if self.is_logging() {
                self.log(unit, format_args!("{} ticks {} for {:.2}", action, target, damage));
            }
            self.fire_unit_hooks(unit, |hooks, ctx| hooks.on_periodic_tick(ctx, &tick));
        }

        if let Some(slot) = self.units[unit.0].dots.get_mut(index) {
            slot.ticks_left -= 1;
            if slot.ticks_left == 0 {
                slot.close_uptime(now);
                slot.active = false;
                slot.next_tick = None;
            } else {
                slot.next_tick = Some(self.scheduler.schedule(
                    now + slot.tick_length,
                    Priority::Default,
                    ActionKind::DotTick { unit, slot: index },
                ));
            }
        }
        self.resolve_triggered(unit);
    }

    /// One white swing on the primary target; returns its outcome
    pub(crate) fn swing(&mut self, unit: UnitId) -> Option<HitOutcome> {
        let now = self.now();
        let weapon = self.units[unit.0].weapon?;
        let target_id = TargetId(0);
        if self.targets.is_empty() {
            return None;
        }

        self.fire_unit_hooks(unit, |hooks, ctx| hooks.on_before_melee(ctx));

        let character = &self.units[unit.0];
        let stats = character.stats();
        let pseudo = character.pseudo;
        let target = &self.targets[target_id.0];
        let table = HitTable::melee(&stats, &pseudo, &target.config, &self.constants, true, 0.0);
        let outcome = table.roll(self.rng.next_f64(AttackTable::MeleeWhite.rng_label()));

        let damage = if outcome.landed() {
            let base = self.rng.range("damage roll", weapon.min_damage, weapon.max_damage)
                + stats[Stat::AttackPower] * weapon.attack_power_coefficient * weapon.swing_speed_secs;
            let mitigation = Mitigation {
                school: SpellSchool::Physical,
                table: AttackTable::MeleeWhite,
                target: &target.config,
                taken_multiplier: target.damage_taken_multiplier(now),
                constants: &self.constants,
            };
            mitigation.apply(base * pseudo.damage_dealt_multiplier, outcome, &pseudo)
        } else {
            0.0
        };

        let hit = HitResult {
            action: ActionId::other(OtherAction::MeleeSwing),
            target: target_id,
            outcome,
            damage,
            threat: damage * pseudo.threat_multiplier,
            periodic: false,
        };
        self.targets[target_id.0].damage_taken += damage;
        self.units[unit.0].metrics.add_hit(&hit, true);
        if self.is_logging() {
            self.log(unit, format_args!("Melee swing {} for {:.2}", outcome, damage));
        }
        self.fire_unit_hooks(unit, |hooks, ctx| hooks.on_melee_attack(ctx, &hit));

        let speed = weapon.swing_speed().div_f64(self.units[unit.0].melee_haste(&self.constants));
        let next = now + speed.max(Duration::from_millis(1));
        self.units[unit.0].swing_action = Some(self.scheduler.schedule(
            next,
            Priority::Default,
            ActionKind::AutoAttack(unit),
        ));

        self.resolve_triggered(unit);
        Some(outcome)
    }

    /// Run a hook on every hooked aura of `unit`
    pub(crate) fn fire_unit_hooks(
        &mut self,
        unit: UnitId,
        f: impl FnMut(&mut dyn AuraHooks, &mut AuraContext<'_>),
    ) {
        let mut env = HookEnv {
            now: self.scheduler.now(),
            rng: &mut self.rng,
            triggered: &mut self.triggered,
        };
        self.units[unit.0].fire_hooks(&mut env, f);
    }

    /// Resolve casts queued by hooks, including any they queue in turn
    ///
    /// Triggered casts are free and off the GCD; their own cooldown still
    /// applies.
    pub(crate) fn resolve_triggered(&mut self, unit: UnitId) {
        while !self.triggered.is_empty() {
            let pending = std::mem::take(&mut self.triggered);
            for TriggeredCast { cast, target } in pending {
                if target.0 >= self.targets.len() {
                    continue;
                }
                let now = self.now();
                let cooldown = CooldownId::Action(cast.action.key());
                let cooldowns = self.units[unit.0].cooldowns_mut();
                if !cooldowns.is_ready(cooldown, now) {
                    continue;
                }
                if let Some(length) = cast.cooldown {
                    cooldowns.start(cooldown, now, length);
                }
                self.complete_cast(unit, cast, target);
            }
        }
    }
}
