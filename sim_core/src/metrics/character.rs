use super::{ActionMetrics, AuraMetrics, DistributionMetrics};
use crate::aura::AuraUptime;
use crate::combat::{DotTarget, HitResult};
use stats_core::{ActionId, ActionKey};
use std::collections::BTreeMap;
use std::time::Duration;

/// Metrics for the current iteration only, cleared by `reset`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationMetrics {
    /// Whether the unit ran out of resource at least once
    pub went_oom: bool,
    pub resource_spent: f64,
    pub resource_gained: f64,
    /// Time spent waiting for regeneration instead of acting
    pub oom_time: Duration,
}

/// Everything recorded for one participant
///
/// Per-action and per-aura tables are keyed by [`ActionKey`], so distinct
/// tags of the same spell are tracked separately. DoT uptime is kept apart
/// from aura uptime, one entry per (action, target) slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterMetrics {
    pub dps: DistributionMetrics,
    pub threat: DistributionMetrics,
    pub iteration: IterationMetrics,

    oom_time_sum: f64,
    oom_iterations: u32,
    resource_spent_sum: f64,
    actions: BTreeMap<ActionKey, ActionMetrics>,
    auras: BTreeMap<ActionKey, AuraMetrics>,
    dots: BTreeMap<(ActionKey, DotTarget), AuraMetrics>,
}

impl CharacterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn action_entry(&mut self, action: ActionId, is_melee: bool) -> &mut ActionMetrics {
        self.actions
            .entry(action.key())
            .or_insert_with(|| ActionMetrics::new(action, is_melee))
    }

    /// Count a completed cast, independent of how many targets it hit
    pub fn add_cast(&mut self, action: ActionId, is_melee: bool) {
        self.action_entry(action, is_melee).casts += 1;
    }

    /// Record the result of one hit or tick
    pub fn add_hit(&mut self, hit: &HitResult, is_melee: bool) {
        self.action_entry(hit.action, is_melee).record(hit);
        self.dps.total += hit.damage;
        self.threat.total += hit.threat;
    }

    pub fn mark_oom(&mut self, duration: Duration) {
        self.iteration.oom_time += duration;
        self.iteration.went_oom = true;
    }

    pub fn add_aura_uptime(&mut self, uptime: &AuraUptime) {
        self.auras
            .entry(uptime.action.key())
            .or_insert_with(|| AuraMetrics::new(uptime.action))
            .add_iteration(uptime.uptime.as_secs_f64(), uptime.gains);
    }

    pub fn add_dot_uptime(&mut self, target: DotTarget, uptime: &AuraUptime) {
        self.dots
            .entry((uptime.action.key(), target))
            .or_insert_with(|| AuraMetrics::new(uptime.action))
            .add_iteration(uptime.uptime.as_secs_f64(), uptime.gains);
    }

    /// Include a pet's iteration total in this unit's total
    ///
    /// Must run after the pet's own `done_iteration` and before this unit's.
    pub fn add_final_pet_metrics(&mut self, pet: &CharacterMetrics) {
        self.dps.total += pet.dps.total;
    }

    pub fn reset(&mut self) {
        self.dps.reset();
        self.threat.reset();
        self.iteration = IterationMetrics::default();
    }

    /// Fold the current iteration into the aggregates
    pub fn done_iteration(&mut self, encounter_secs: f64) {
        self.dps.done_iteration(encounter_secs);
        self.threat.done_iteration(encounter_secs);
        self.oom_time_sum += self.iteration.oom_time.as_secs_f64();
        self.resource_spent_sum += self.iteration.resource_spent;
        if self.iteration.went_oom {
            self.oom_iterations += 1;
        }
    }

    /// Combine the aggregates of another batch for the same unit
    pub fn merge(&mut self, other: &CharacterMetrics) {
        self.dps.merge(&other.dps);
        self.threat.merge(&other.threat);
        self.oom_time_sum += other.oom_time_sum;
        self.oom_iterations += other.oom_iterations;
        self.resource_spent_sum += other.resource_spent_sum;
        for (key, action) in &other.actions {
            self.actions
                .entry(*key)
                .or_insert_with(|| ActionMetrics::new(action.action, action.is_melee))
                .merge(action);
        }
        for (key, aura) in &other.auras {
            self.auras
                .entry(*key)
                .or_insert_with(|| AuraMetrics::new(aura.action))
                .merge(aura);
        }
        for (key, dot) in &other.dots {
            self.dots
                .entry(*key)
                .or_insert_with(|| AuraMetrics::new(dot.action))
                .merge(dot);
        }
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionMetrics> {
        self.actions.values()
    }

    pub fn action(&self, action: ActionId) -> Option<&ActionMetrics> {
        self.actions.get(&action.key())
    }

    pub fn auras(&self) -> impl Iterator<Item = &AuraMetrics> {
        self.auras.values()
    }

    pub fn dots(&self) -> impl Iterator<Item = (DotTarget, &AuraMetrics)> {
        self.dots.iter().map(|((_, target), dot)| (*target, dot))
    }

    pub fn oom_time_sum(&self) -> f64 {
        self.oom_time_sum
    }

    pub fn oom_iterations(&self) -> u32 {
        self.oom_iterations
    }

    pub fn resource_spent_sum(&self) -> f64 {
        self.resource_spent_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::HitOutcome;
    use crate::target::TargetId;

    fn hit(action: ActionId, damage: f64) -> HitResult {
        HitResult {
            action,
            target: TargetId(0),
            outcome: HitOutcome::Hit,
            damage,
            threat: damage * 2.0,
            periodic: false,
        }
    }

    #[test]
    fn test_iteration_totals() {
        let mut m = CharacterMetrics::new();
        m.add_cast(ActionId::spell(1), false);
        m.add_hit(&hit(ActionId::spell(1), 600.0), false);
        m.done_iteration(60.0);

        assert!((m.dps.summary().mean - 10.0).abs() < 1e-9);
        assert!((m.threat.summary().mean - 20.0).abs() < 1e-9);
        assert_eq!(m.action(ActionId::spell(1)).unwrap().casts, 1);
    }

    #[test]
    fn test_tags_tracked_separately() {
        let mut m = CharacterMetrics::new();
        m.add_hit(&hit(ActionId::spell(1), 1.0), false);
        m.add_hit(&hit(ActionId::spell(1).with_tag(1), 1.0), false);
        assert_eq!(m.actions().count(), 2);
    }

    #[test]
    fn test_pet_total_merges_into_owner() {
        let mut owner = CharacterMetrics::new();
        let mut pet = CharacterMetrics::new();
        owner.add_hit(&hit(ActionId::spell(1), 300.0), false);
        pet.add_hit(&hit(ActionId::spell(2), 300.0), true);

        pet.done_iteration(60.0);
        owner.add_final_pet_metrics(&pet);
        owner.done_iteration(60.0);

        assert!((pet.dps.summary().mean - 5.0).abs() < 1e-9);
        assert!((owner.dps.summary().mean - 10.0).abs() < 1e-9);
    }

    fn uptime(action: ActionId, secs: u64) -> AuraUptime {
        AuraUptime {
            action,
            uptime: Duration::from_secs(secs),
            gains: 1,
        }
    }

    #[test]
    fn test_dot_uptime_kept_per_target() {
        let dot = ActionId::spell(7);
        let mut m = CharacterMetrics::new();
        m.add_aura_uptime(&uptime(dot, 60));
        m.add_dot_uptime(DotTarget::Single(TargetId(0)), &uptime(dot, 30));
        m.add_dot_uptime(DotTarget::Single(TargetId(1)), &uptime(dot, 30));

        let aura = m.auras().next().unwrap().summary(1, 60.0);
        assert!((aura.uptime_fraction - 1.0).abs() < 1e-9);

        let dots: Vec<_> = m.dots().map(|(t, d)| (t, d.summary(1, 60.0))).collect();
        assert_eq!(dots.len(), 2);
        assert_eq!(dots[0].0, DotTarget::Single(TargetId(0)));
        for (_, summary) in &dots {
            assert!((summary.uptime_fraction - 0.5).abs() < 1e-9);
        }

        let mut merged = CharacterMetrics::new();
        merged.merge(&m);
        merged.merge(&m);
        let (_, first) = merged.dots().next().unwrap();
        assert!((first.summary(2, 60.0).uptime_secs_avg - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_oom_accounting() {
        let mut m = CharacterMetrics::new();
        m.mark_oom(Duration::from_secs(3));
        m.mark_oom(Duration::from_secs(2));
        m.done_iteration(60.0);
        m.reset();
        m.done_iteration(60.0);

        assert!((m.oom_time_sum() - 5.0).abs() < 1e-9);
        assert_eq!(m.oom_iterations(), 1);
    }
}
