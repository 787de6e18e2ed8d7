//! Aggregate output of a run

use crate::character::UnitId;
use crate::combat::DotTarget;
use crate::metrics::{
    ActionMetrics, AuraSummary, CharacterMetrics, DistributionMetrics, DistributionSummary, TargetMetrics,
};
use serde::Serialize;
use stats_core::ActionId;

/// Statistics over every completed iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimResult {
    pub iterations: u32,
    pub duration_secs: f64,
    /// Sum of every player's DPS (pets included through their owners)
    pub raid: DistributionSummary,
    pub units: Vec<UnitResult>,
    pub targets: Vec<TargetResult>,
    /// Combat log of the first iteration, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<String>,
}

impl SimResult {
    pub fn unit(&self, name: &str) -> Option<&UnitResult> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitResult {
    pub name: String,
    /// Owning unit for pets
    pub owner: Option<UnitId>,
    pub dps: DistributionSummary,
    pub threat: DistributionSummary,
    pub actions: Vec<ActionMetrics>,
    pub auras: Vec<AuraSummary>,
    /// DoT uptime per slot, so one DoT on several targets is reported per target
    pub dots: Vec<DotSummary>,
    /// Average time per iteration spent waiting for resource
    pub oom_seconds_avg: f64,
    /// `oom_seconds_avg` as a fraction of the encounter
    pub starvation_fraction: f64,
    /// Share of iterations in which the unit ran dry at least once
    pub oom_iteration_fraction: f64,
    pub resource_spent_avg: f64,

    #[serde(skip)]
    iterations: u32,
    #[serde(skip)]
    duration_secs: f64,
}

impl UnitResult {
    pub(crate) fn new(name: String, owner: Option<UnitId>, metrics: &CharacterMetrics, iterations: u32, duration_secs: f64) -> Self {
        let n = iterations.max(1) as f64;
        let oom_seconds_avg = metrics.oom_time_sum() / n;
        UnitResult {
            name,
            owner,
            dps: metrics.dps.summary(),
            threat: metrics.threat.summary(),
            actions: metrics.actions().cloned().collect(),
            auras: metrics
                .auras()
                .map(|a| a.summary(iterations, duration_secs))
                .collect(),
            dots: metrics
                .dots()
                .map(|(target, d)| DotSummary {
                    target,
                    uptime: d.summary(iterations, duration_secs),
                })
                .collect(),
            oom_seconds_avg,
            starvation_fraction: oom_seconds_avg / duration_secs,
            oom_iteration_fraction: metrics.oom_iterations() as f64 / n,
            resource_spent_avg: metrics.resource_spent_sum() / n,
            iterations,
            duration_secs,
        }
    }

    fn matching(&self, action: ActionId, ignore_tag: bool) -> impl Iterator<Item = &ActionMetrics> {
        self.actions.iter().filter(move |m| {
            if ignore_tag {
                m.action.source == action.source
            } else {
                m.action.key() == action.key()
            }
        })
    }

    /// Average DPS of one action; `ignore_tag` sums every tag of it
    pub fn action_dps(&self, action: ActionId, ignore_tag: bool) -> f64 {
        let damage: f64 = self.matching(action, ignore_tag).map(|m| m.damage).sum();
        damage / self.iterations.max(1) as f64 / self.duration_secs
    }

    /// Damage per cast, ticks included
    pub fn average_cast_damage(&self, action: ActionId) -> f64 {
        let (damage, casts) = self
            .matching(action, false)
            .fold((0.0, 0u64), |(d, c), m| (d + m.damage, c + m.casts));
        if casts == 0 {
            return 0.0;
        }
        damage / casts as f64
    }

    pub fn action(&self, action: ActionId) -> Option<&ActionMetrics> {
        self.matching(action, false).next()
    }

    pub fn aura(&self, action: ActionId) -> Option<&AuraSummary> {
        self.auras.iter().find(|a| a.action.key() == action.key())
    }

    pub fn dot(&self, action: ActionId, target: DotTarget) -> Option<&AuraSummary> {
        self.dots
            .iter()
            .find(|d| d.target == target && d.uptime.action.key() == action.key())
            .map(|d| &d.uptime)
    }
}

/// Uptime of one DoT slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DotSummary {
    pub target: DotTarget,
    #[serde(flatten)]
    pub uptime: AuraSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetResult {
    pub name: String,
    pub damage_taken_avg: f64,
    /// Debuff uptime on this target
    pub auras: Vec<AuraSummary>,
}

impl TargetResult {
    pub fn aura(&self, action: ActionId) -> Option<&AuraSummary> {
        self.auras.iter().find(|a| a.action.key() == action.key())
    }
}

/// Per-unit aggregates of one batch of iterations
#[derive(Debug, Clone)]
pub(crate) struct UnitBatch {
    pub name: String,
    pub owner: Option<UnitId>,
    pub metrics: CharacterMetrics,
}

#[derive(Debug, Clone)]
pub(crate) struct TargetBatch {
    pub name: String,
    pub metrics: TargetMetrics,
}

/// Everything a worker hands back for a contiguous range of iterations
#[derive(Debug, Clone)]
pub(crate) struct Batch {
    pub iterations: u32,
    pub duration_secs: f64,
    pub raid: DistributionMetrics,
    pub units: Vec<UnitBatch>,
    pub targets: Vec<TargetBatch>,
    pub debug_log: Option<String>,
}

impl Batch {
    /// Fold a later batch into this one
    pub fn merge(&mut self, other: &Batch) {
        self.iterations += other.iterations;
        self.raid.merge(&other.raid);
        for (unit, theirs) in self.units.iter_mut().zip(&other.units) {
            unit.metrics.merge(&theirs.metrics);
        }
        for (target, theirs) in self.targets.iter_mut().zip(&other.targets) {
            target.metrics.merge(&theirs.metrics);
        }
        if self.debug_log.is_none() {
            self.debug_log = other.debug_log.clone();
        }
    }

    pub fn to_result(&self) -> SimResult {
        let n = self.iterations.max(1) as f64;
        SimResult {
            iterations: self.iterations,
            duration_secs: self.duration_secs,
            raid: self.raid.summary(),
            units: self
                .units
                .iter()
                .map(|u| UnitResult::new(u.name.clone(), u.owner, &u.metrics, self.iterations, self.duration_secs))
                .collect(),
            targets: self
                .targets
                .iter()
                .map(|t| TargetResult {
                    name: t.name.clone(),
                    damage_taken_avg: t.metrics.damage_taken_sum() / n,
                    auras: t
                        .metrics
                        .auras()
                        .map(|a| a.summary(self.iterations, self.duration_secs))
                        .collect(),
                })
                .collect(),
            debug_log: self.debug_log.clone(),
        }
    }
}
