//! Stat dependency graph
//!
//! Derived stats (one stat boosting another) are registered as edges
//! `source -> modified` and resolved once, in topological order, when the
//! owning character finalizes.

use crate::types::{Stat, Stats};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// `(source value, current modified value) -> new modified value`
pub type StatModifier = Arc<dyn Fn(f64, f64) -> f64 + Send + Sync>;

/// One edge of the dependency graph
#[derive(Clone)]
pub struct StatDependency {
    pub source: Stat,
    pub modified: Stat,
    pub modifier: StatModifier,
}

impl StatDependency {
    /// Create a dependency from an arbitrary modifier
    pub fn new(
        source: Stat,
        modified: Stat,
        modifier: impl Fn(f64, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        StatDependency {
            source,
            modified,
            modifier: Arc::new(modifier),
        }
    }

    /// `modified += source * ratio`
    pub fn linear(source: Stat, modified: Stat, ratio: f64) -> Self {
        Self::new(source, modified, move |src, cur| cur + src * ratio)
    }

    /// `stat *= factor`
    pub fn multiplier(stat: Stat, factor: f64) -> Self {
        Self::new(stat, stat, move |src, _| src * factor)
    }

    fn is_self_dependency(&self) -> bool {
        self.source == self.modified
    }
}

impl fmt::Debug for StatDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatDependency")
            .field("source", &self.source)
            .field("modified", &self.modified)
            .finish()
    }
}

/// Collects dependencies and resolves them in a fixed order
#[derive(Debug, Clone, Default)]
pub struct StatDependencyManager {
    deps: Vec<StatDependency>,
    /// Dependency indices in application order, set by `finalize`
    order: Option<Vec<usize>>,
}

impl StatDependencyManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dependency. Panics once finalized.
    pub fn add(&mut self, dep: StatDependency) {
        if self.order.is_some() {
            panic!(
                "Cannot add stat dependency {:?} -> {:?} after finalize",
                dep.source, dep.modified
            );
        }
        self.deps.push(dep);
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn is_finalized(&self) -> bool {
        self.order.is_some()
    }

    /// Compute the application order. Calling twice is a no-op.
    ///
    /// Stats are visited in topological order of the cross-stat edges; for
    /// each stat, incoming edges from other stats are applied first (in
    /// registration order), then its self-multipliers. Panics on a cycle.
    pub fn finalize(&mut self) {
        if self.order.is_some() {
            return;
        }

        let mut in_degree = [0usize; Stat::COUNT];
        for dep in self.deps.iter().filter(|d| !d.is_self_dependency()) {
            in_degree[dep.modified.index()] += 1;
        }

        let mut ready: BTreeSet<Stat> = Stat::all()
            .iter()
            .copied()
            .filter(|s| in_degree[s.index()] == 0)
            .collect();
        let mut visited = 0;
        let mut order = Vec::with_capacity(self.deps.len());

        while let Some(stat) = ready.pop_first() {
            visited += 1;

            order.extend(
                self.deps
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| d.modified == stat && !d.is_self_dependency())
                    .map(|(i, _)| i),
            );
            order.extend(
                self.deps
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| d.modified == stat && d.is_self_dependency())
                    .map(|(i, _)| i),
            );

            for dep in self.deps.iter().filter(|d| d.source == stat && !d.is_self_dependency()) {
                let slot = &mut in_degree[dep.modified.index()];
                *slot -= 1;
                if *slot == 0 {
                    ready.insert(dep.modified);
                }
            }
        }

        if visited != Stat::COUNT {
            let stuck: Vec<Stat> = Stat::all()
                .iter()
                .copied()
                .filter(|s| in_degree[s.index()] > 0)
                .collect();
            panic!("Stat dependency cycle detected among {:?}", stuck);
        }

        self.order = Some(order);
    }

    /// Apply all dependencies to a stat vector. Panics if not finalized.
    pub fn apply(&self, stats: Stats) -> Stats {
        let order = self
            .order
            .as_ref()
            .expect("StatDependencyManager::apply called before finalize");

        let mut out = stats;
        for &i in order {
            let dep = &self.deps[i];
            out[dep.modified] = (dep.modifier)(out[dep.source], out[dep.modified]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_linear_dependency() {
        let mut mgr = StatDependencyManager::new();
        mgr.add(StatDependency::linear(Stat::Intellect, Stat::Mana, 15.0));
        mgr.finalize();

        let mut stats = Stats::new();
        stats[Stat::Intellect] = 100.0;
        stats[Stat::Mana] = 1000.0;

        let out = mgr.apply(stats);
        assert!((out[Stat::Mana] - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_self_multiplier_applies_before_outgoing_edges() {
        // Registered out of order: the mana edge must still see boosted intellect.
        let mut mgr = StatDependencyManager::new();
        mgr.add(StatDependency::linear(Stat::Intellect, Stat::Mana, 15.0));
        mgr.add(StatDependency::multiplier(Stat::Intellect, 1.1));
        mgr.finalize();

        let out = mgr.apply(Stats::single(Stat::Intellect, 100.0));
        assert!((out[Stat::Intellect] - 110.0).abs() < 1e-9);
        assert!((out[Stat::Mana] - 1650.0).abs() < 1e-9);
    }

    #[test]
    fn test_chain_resolves_in_topological_order() {
        // Spirit -> Intellect -> Mana, registered in reverse order.
        let mut mgr = StatDependencyManager::new();
        mgr.add(StatDependency::linear(Stat::Intellect, Stat::Mana, 10.0));
        mgr.add(StatDependency::linear(Stat::Spirit, Stat::Intellect, 0.5));
        mgr.finalize();

        let out = mgr.apply(Stats::single(Stat::Spirit, 100.0));
        assert!((out[Stat::Intellect] - 50.0).abs() < 1e-9);
        assert!((out[Stat::Mana] - 500.0).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn test_cycle_panics() {
        let mut mgr = StatDependencyManager::new();
        mgr.add(StatDependency::linear(Stat::Spirit, Stat::Intellect, 0.5));
        mgr.add(StatDependency::linear(Stat::Intellect, Stat::Spirit, 0.5));
        mgr.finalize();
    }

    #[test]
    #[should_panic(expected = "after finalize")]
    fn test_add_after_finalize_panics() {
        let mut mgr = StatDependencyManager::new();
        mgr.finalize();
        mgr.add(StatDependency::multiplier(Stat::Stamina, 1.1));
    }

    #[test]
    fn test_finalize_twice_is_noop() {
        let mut mgr = StatDependencyManager::new();
        mgr.add(StatDependency::multiplier(Stat::Stamina, 2.0));
        mgr.finalize();
        mgr.finalize();
        let out = mgr.apply(Stats::single(Stat::Stamina, 3.0));
        assert!((out[Stat::Stamina] - 6.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_linear_edges_are_order_independent(int in 0.0f64..1000.0, ratio in 0.0f64..20.0) {
            let mut forward = StatDependencyManager::new();
            forward.add(StatDependency::linear(Stat::Intellect, Stat::Mana, ratio));
            forward.add(StatDependency::linear(Stat::Agility, Stat::Armor, 2.0));
            forward.finalize();

            let mut reverse = StatDependencyManager::new();
            reverse.add(StatDependency::linear(Stat::Agility, Stat::Armor, 2.0));
            reverse.add(StatDependency::linear(Stat::Intellect, Stat::Mana, ratio));
            reverse.finalize();

            let stats = Stats::single(Stat::Intellect, int) + Stats::single(Stat::Agility, int);
            prop_assert_eq!(forward.apply(stats), reverse.apply(stats));
        }
    }
}
