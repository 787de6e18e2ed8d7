//! Temporal effect tracking
//!
//! [`AuraTracker`] keeps aura lifetimes, stacks and uptime. It never runs
//! hooks itself: it reports what changed and hands hook objects out so the
//! owner can call them with a full [`AuraContext`].

mod cooldown;
mod types;

pub use cooldown::{CooldownId, CooldownTracker, InternalCooldown};
pub use types::{
    Aura, AuraContext, AuraEffect, AuraHooks, AuraId, ReapplyPolicy, TriggeredCast,
};

pub(crate) use types::HookEnv;

use stats_core::ActionId;
use std::collections::HashMap;
use std::time::Duration;

/// Result of adding an aura
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuraChange {
    Gained { slot: usize },
    Refreshed { slot: usize },
    StacksChanged { slot: usize, old: u32, new: u32 },
    Rejected,
}

/// State of an aura that just went away
pub struct RemovedAura {
    pub action: ActionId,
    pub stacks: u32,
    pub effect: AuraEffect,
    pub hooks: Option<Box<dyn AuraHooks>>,
}

/// One aura id's slot; reused every time that aura is gained
struct AuraSlot {
    action: ActionId,
    active: bool,
    /// Bumped on every gain so stale hook handles can be detected
    instance: u64,
    expires: Duration,
    stacks: u32,
    policy: ReapplyPolicy,
    effect: AuraEffect,
    hooks: Option<Box<dyn AuraHooks>>,
    uptime: Duration,
    uptime_from: Duration,
    gains: u32,
}

impl AuraSlot {
    fn accrue(&mut self, now: Duration) {
        let end = now.min(self.expires);
        if end > self.uptime_from {
            self.uptime += end - self.uptime_from;
            self.uptime_from = end;
        }
    }
}

/// Uptime of one aura over the current iteration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuraUptime {
    pub action: ActionId,
    pub uptime: Duration,
    pub gains: u32,
}

/// Tracks the auras of one participant
#[derive(Default)]
pub struct AuraTracker {
    slots: Vec<AuraSlot>,
    index: HashMap<AuraId, usize>,
    next_instance: u64,
}

impl AuraTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or re-add an aura at `now`
    ///
    /// On a fresh gain the aura's hooks are stored; on refresh or stacking
    /// the running instance keeps its own hooks. Expiries up to `now` must
    /// already have been processed.
    pub fn add(&mut self, aura: Aura, now: Duration) -> AuraChange {
        let id = aura.id();
        let slot = match self.index.get(&id) {
            Some(&slot) => slot,
            None => {
                self.slots.push(AuraSlot {
                    action: aura.action,
                    active: false,
                    instance: 0,
                    expires: Duration::ZERO,
                    stacks: 0,
                    policy: aura.policy,
                    effect: aura.effect,
                    hooks: None,
                    uptime: Duration::ZERO,
                    uptime_from: Duration::ZERO,
                    gains: 0,
                });
                self.index.insert(id, self.slots.len() - 1);
                self.slots.len() - 1
            }
        };

        let expires = now.saturating_add(aura.duration);
        let entry = &mut self.slots[slot];
        if entry.active && entry.expires > now {
            entry.accrue(now);
            match entry.policy {
                ReapplyPolicy::Reject => AuraChange::Rejected,
                ReapplyPolicy::Refresh => {
                    entry.expires = expires;
                    AuraChange::Refreshed { slot }
                }
                ReapplyPolicy::Stack { max_stacks } => {
                    entry.expires = expires;
                    let old = entry.stacks;
                    let new = (old + 1).min(max_stacks.max(1));
                    if new == old {
                        return AuraChange::Refreshed { slot };
                    }
                    entry.stacks = new;
                    AuraChange::StacksChanged { slot, old, new }
                }
            }
        } else {
            if entry.active {
                entry.accrue(now);
            }
            self.next_instance += 1;
            entry.active = true;
            entry.instance = self.next_instance;
            entry.expires = expires;
            entry.stacks = 1;
            entry.policy = aura.policy;
            entry.effect = aura.effect;
            entry.hooks = aura.hooks;
            entry.uptime_from = now;
            entry.gains += 1;
            AuraChange::Gained { slot }
        }
    }

    /// Deactivate an aura. Removing an absent aura is a no-op.
    pub fn remove(&mut self, id: AuraId, now: Duration) -> Option<RemovedAura> {
        let slot = *self.index.get(&id)?;
        self.remove_slot(slot, now)
    }

    fn remove_slot(&mut self, slot: usize, now: Duration) -> Option<RemovedAura> {
        let entry = &mut self.slots[slot];
        if !entry.active {
            return None;
        }
        entry.accrue(now);
        entry.active = false;
        let removed = RemovedAura {
            action: entry.action,
            stacks: entry.stacks,
            effect: entry.effect,
            hooks: entry.hooks.take(),
        };
        entry.stacks = 0;
        Some(removed)
    }

    /// Set the stack count directly
    ///
    /// Returns the old and new count, or `None` if the aura is not active.
    /// A count of zero leaves the stored count alone; the caller removes the
    /// aura so its expire hook runs exactly once.
    pub fn set_stacks(&mut self, id: AuraId, stacks: u32) -> Option<(u32, u32)> {
        let slot = *self.index.get(&id)?;
        let entry = &mut self.slots[slot];
        if !entry.active {
            return None;
        }
        let old = entry.stacks;
        if stacks > 0 {
            entry.stacks = stacks;
        }
        Some((old, stacks))
    }

    /// True for `now` in `[gained, expires)`
    pub fn is_active(&self, id: AuraId, now: Duration) -> bool {
        self.slot(id).is_some_and(|s| s.active && now < s.expires)
    }

    pub fn stacks(&self, id: AuraId, now: Duration) -> u32 {
        if self.is_active(id, now) {
            self.slot(id).map_or(0, |s| s.stacks)
        } else {
            0
        }
    }

    /// Time until expiry; zero when inactive
    pub fn remaining(&self, id: AuraId, now: Duration) -> Duration {
        match self.slot(id) {
            Some(s) if s.active && now < s.expires => s.expires - now,
            _ => Duration::ZERO,
        }
    }

    pub fn expires_at(&self, id: AuraId) -> Option<Duration> {
        self.slot(id).filter(|s| s.active).map(|s| s.expires)
    }

    /// Effects of every aura active at `now`, with their stack counts
    pub fn active_effects(&self, now: Duration) -> impl Iterator<Item = (AuraEffect, u32)> + '_ {
        self.slots
            .iter()
            .filter(move |s| s.active && now < s.expires)
            .map(|s| (s.effect, s.stacks))
    }

    pub fn effect(&self, slot: usize) -> AuraEffect {
        self.slots[slot].effect
    }

    pub fn action(&self, slot: usize) -> ActionId {
        self.slots[slot].action
    }

    /// Accumulate uptime up to `now` and return the slots that have expired,
    /// earliest expiry first
    pub fn advance(&mut self, now: Duration) -> Vec<usize> {
        let mut expired: Vec<(Duration, usize)> = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            slot.accrue(now);
            if slot.expires <= now {
                expired.push((slot.expires, i));
            }
        }
        expired.sort();
        expired.into_iter().map(|(_, i)| i).collect()
    }

    /// Expire a slot returned by `advance`
    pub fn expire(&mut self, slot: usize, now: Duration) -> Option<RemovedAura> {
        self.remove_slot(slot, now)
    }

    /// Active slots that carry hooks, in slot order, with their instance
    pub fn hooked(&self) -> Vec<(usize, u64)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active && s.hooks.is_some())
            .map(|(i, s)| (i, s.instance))
            .collect()
    }

    pub fn instance(&self, slot: usize) -> u64 {
        self.slots[slot].instance
    }

    /// Take a slot's hooks out so they can run with mutable access to the owner
    pub fn take_hooks(&mut self, slot: usize, instance: u64) -> Option<Box<dyn AuraHooks>> {
        let entry = &mut self.slots[slot];
        if entry.instance != instance {
            return None;
        }
        entry.hooks.take()
    }

    /// Put hooks back, unless the aura was removed or re-gained meanwhile
    pub fn restore_hooks(&mut self, slot: usize, instance: u64, hooks: Box<dyn AuraHooks>) {
        let entry = &mut self.slots[slot];
        if entry.active && entry.instance == instance && entry.hooks.is_none() {
            entry.hooks = Some(hooks);
        }
    }

    /// Uptime of every aura seen this iteration
    pub fn uptimes(&self) -> impl Iterator<Item = AuraUptime> + '_ {
        self.slots.iter().filter(|s| s.gains > 0).map(|s| AuraUptime {
            action: s.action,
            uptime: s.uptime,
            gains: s.gains,
        })
    }

    /// Close uptime windows at the end of an iteration without expiring anything
    pub fn close_uptime(&mut self, now: Duration) {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.accrue(now);
        }
    }

    /// Deactivate everything and zero per-iteration counters
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
            slot.hooks = None;
            slot.stacks = 0;
            slot.uptime = Duration::ZERO;
            slot.uptime_from = Duration::ZERO;
            slot.gains = 0;
        }
    }

    pub fn slot_index(&self, id: AuraId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    fn slot(&self, id: AuraId) -> Option<&AuraSlot> {
        self.index.get(&id).map(|&i| &self.slots[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(v: f64) -> Duration {
        Duration::from_secs_f64(v)
    }

    fn aura(id: i32, duration: f64) -> Aura {
        Aura::new(ActionId::spell(id), format!("aura {}", id), secs(duration))
    }

    #[test]
    fn test_gain_and_expire() {
        let mut tracker = AuraTracker::new();
        let id = ActionId::spell(1).key();
        assert_eq!(tracker.add(aura(1, 10.0), secs(2.0)), AuraChange::Gained { slot: 0 });

        assert!(tracker.is_active(id, secs(2.0)));
        assert!(tracker.is_active(id, secs(11.9)));
        assert!(!tracker.is_active(id, secs(12.0)));
        assert_eq!(tracker.remaining(id, secs(4.0)), secs(8.0));

        assert!(tracker.advance(secs(11.0)).is_empty());
        let expired = tracker.advance(secs(13.0));
        assert_eq!(expired, vec![0]);
        assert!(tracker.expire(0, secs(13.0)).is_some());

        let up = tracker.uptimes().next().unwrap();
        assert_eq!(up.uptime, secs(10.0));
        assert_eq!(up.gains, 1);
    }

    #[test]
    fn test_refresh_policy() {
        let mut tracker = AuraTracker::new();
        let id = ActionId::spell(1).key();
        tracker.add(aura(1, 10.0), secs(0.0));
        assert_eq!(tracker.add(aura(1, 10.0), secs(5.0)), AuraChange::Refreshed { slot: 0 });
        assert_eq!(tracker.expires_at(id), Some(secs(15.0)));
    }

    #[test]
    fn test_stack_policy_caps() {
        let mut tracker = AuraTracker::new();
        let id = ActionId::spell(2).key();
        let stacking = || aura(2, 10.0).with_policy(ReapplyPolicy::Stack { max_stacks: 2 });

        tracker.add(stacking(), secs(0.0));
        assert_eq!(
            tracker.add(stacking(), secs(1.0)),
            AuraChange::StacksChanged { slot: 0, old: 1, new: 2 }
        );
        assert_eq!(tracker.add(stacking(), secs(2.0)), AuraChange::Refreshed { slot: 0 });
        assert_eq!(tracker.stacks(id, secs(2.0)), 2);
    }

    #[test]
    fn test_reject_policy_keeps_expiry() {
        let mut tracker = AuraTracker::new();
        let id = ActionId::spell(3).key();
        let rejecting = || aura(3, 10.0).with_policy(ReapplyPolicy::Reject);

        tracker.add(rejecting(), secs(0.0));
        assert_eq!(tracker.add(rejecting(), secs(5.0)), AuraChange::Rejected);
        assert_eq!(tracker.expires_at(id), Some(secs(10.0)));
    }

    #[test]
    fn test_zero_duration_never_active() {
        let mut tracker = AuraTracker::new();
        let id = ActionId::spell(4).key();
        assert!(matches!(tracker.add(aura(4, 0.0), secs(3.0)), AuraChange::Gained { .. }));
        assert!(!tracker.is_active(id, secs(3.0)));
        assert_eq!(tracker.remaining(id, secs(3.0)), Duration::ZERO);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut tracker = AuraTracker::new();
        assert!(tracker.remove(ActionId::spell(9).key(), secs(1.0)).is_none());

        tracker.add(aura(9, 5.0), secs(0.0));
        assert!(tracker.remove(ActionId::spell(9).key(), secs(1.0)).is_some());
        assert!(tracker.remove(ActionId::spell(9).key(), secs(1.0)).is_none());
    }

    #[test]
    fn test_tags_are_distinct_auras() {
        let mut tracker = AuraTracker::new();
        tracker.add(aura(5, 5.0), secs(0.0));
        let tagged = Aura::new(ActionId::spell(5).with_tag(2), "tagged", secs(5.0));
        assert!(matches!(tracker.add(tagged, secs(0.0)), AuraChange::Gained { slot: 1 }));
    }

    #[test]
    fn test_stale_hooks_not_restored() {
        struct Noop;
        impl AuraHooks for Noop {}

        let mut tracker = AuraTracker::new();
        let id = ActionId::spell(6).key();
        tracker.add(aura(6, 5.0).with_hooks(Noop), secs(0.0));
        let (slot, instance) = tracker.hooked()[0];
        let hooks = tracker.take_hooks(slot, instance).unwrap();

        // Removed and re-gained while the hook was out.
        tracker.remove(id, secs(1.0));
        tracker.add(aura(6, 5.0), secs(1.0));
        tracker.restore_hooks(slot, instance, hooks);
        assert!(tracker.hooked().is_empty());
    }

    #[test]
    fn test_reset_clears_iteration_state() {
        let mut tracker = AuraTracker::new();
        tracker.add(aura(7, 5.0), secs(0.0));
        tracker.reset();
        assert!(!tracker.is_active(ActionId::spell(7).key(), secs(0.0)));
        assert_eq!(tracker.uptimes().count(), 0);
    }

    proptest! {
        #[test]
        fn prop_activity_window(start_ms in 0u64..100_000, dur_ms in 0u64..100_000, probe_ms in 0u64..300_000) {
            let mut tracker = AuraTracker::new();
            let id = ActionId::spell(1).key();
            let start = Duration::from_millis(start_ms);
            let end = start + Duration::from_millis(dur_ms);
            tracker.add(Aura::new(ActionId::spell(1), "p", Duration::from_millis(dur_ms)), start);

            let probe = Duration::from_millis(probe_ms);
            if probe >= start {
                prop_assert_eq!(tracker.is_active(id, probe), probe < end);
            }
            prop_assert!(!tracker.is_active(id, end));
        }
    }
}
