//! Stat sheet with one-shot finalize

use serde::{Deserialize, Serialize};
use stats_core::{StatDependency, StatDependencyManager, Stats};

/// Stat vector split into setup-time and runtime halves
///
/// Before `finalize` stats accumulate into a base vector. `finalize` runs the
/// dependency graph once and freezes the result as the initial stats; after
/// that only the current stats move, and every change goes through the same
/// dependencies.
#[derive(Debug, Clone, Default)]
pub struct StatSheet {
    base: Stats,
    initial: Stats,
    current: Stats,
    deps: StatDependencyManager,
    finalized: bool,
}

impl StatSheet {
    pub fn new(base: Stats) -> Self {
        StatSheet {
            base,
            ..Default::default()
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Add setup-time stats. Panics after finalize.
    pub fn add_base(&mut self, stats: Stats) {
        if self.finalized {
            panic!("Cannot add base stats after finalize; use add_dynamic");
        }
        self.base += stats;
    }

    /// Register a derived-stat dependency. Panics after finalize.
    pub fn add_dependency(&mut self, dep: StatDependency) {
        if self.finalized {
            panic!(
                "Cannot add stat dependency {:?} -> {:?} after finalize",
                dep.source, dep.modified
            );
        }
        self.deps.add(dep);
    }

    /// Resolve dependencies and freeze the initial stats
    ///
    /// A second call is a no-op while current stats still equal the initial
    /// ones. Re-finalizing after stats have moved is a programming error.
    pub fn finalize(&mut self) {
        if self.finalized {
            if self.current != self.initial {
                panic!("Stats re-finalized after being mutated");
            }
            return;
        }
        self.deps.finalize();
        self.initial = self.deps.apply(self.base);
        self.current = self.initial;
        self.finalized = true;
    }

    pub fn base(&self) -> Stats {
        self.base
    }

    pub fn initial(&self) -> Stats {
        self.ensure_finalized();
        self.initial
    }

    pub fn current(&self) -> Stats {
        self.ensure_finalized();
        self.current
    }

    /// Apply a runtime bonus (or malus, when negative) through the
    /// dependency graph
    pub fn add_dynamic(&mut self, delta: Stats) {
        self.ensure_finalized();
        self.current += self.deps.apply(delta);
    }

    /// Restore current stats to the initial ones
    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    fn ensure_finalized(&self) {
        if !self.finalized {
            panic!("Stats used before finalize");
        }
    }
}

/// Passive modifiers that are not part of the stat vector
///
/// Installed during setup by item effects and talents; auras may move them at
/// runtime, and they are restored at every iteration reset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PseudoStats {
    /// Multiplier on all damage dealt
    pub damage_dealt_multiplier: f64,
    pub threat_multiplier: f64,
    /// Multiplier on resource costs
    pub cost_multiplier: f64,
    /// Flat crit chance, as a fraction
    pub bonus_crit_chance: f64,
    /// Flat hit chance, as a fraction
    pub bonus_hit_chance: f64,
    /// Extra crit damage on top of the base multiplier (0.5 = +50% of the bonus)
    pub crit_damage_bonus: f64,
    /// Multiplier on spell and swing speed
    pub haste_multiplier: f64,
}

impl Default for PseudoStats {
    fn default() -> Self {
        PseudoStats {
            damage_dealt_multiplier: 1.0,
            threat_multiplier: 1.0,
            cost_multiplier: 1.0,
            bonus_crit_chance: 0.0,
            bonus_hit_chance: 0.0,
            crit_damage_bonus: 0.0,
            haste_multiplier: 1.0,
        }
    }
}
