//! Damage-over-time slots
//!
//! A DoT occupies one reusable slot per (action, target) pair on the caster.
//! The slot remembers its pending tick so a restart can cancel it.

use super::cast::DamageInput;
use crate::scheduler::ActionHandle;
use crate::target::TargetId;
use serde::Serialize;
use stats_core::{ActionId, ActionKey, SpellSchool};
use std::collections::HashMap;
use std::time::Duration;

/// Behavior when a DoT is applied while its slot is still ticking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotRefresh {
    /// Keep the tick schedule and reset the remaining tick count
    #[default]
    Extend,
    /// Cancel the pending tick and start a fresh application
    Restart,
}

/// Periodic part of a cast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotInput {
    pub ticks: u32,
    pub tick_length: Duration,
    /// Damage of each tick, rolled once when applied
    pub tick_damage: DamageInput,
    pub refresh: DotRefresh,
}

impl DotInput {
    pub fn new(ticks: u32, tick_length: Duration, tick_damage: DamageInput) -> Self {
        DotInput {
            ticks,
            tick_length,
            tick_damage,
            refresh: DotRefresh::Extend,
        }
    }

    pub fn with_refresh(mut self, refresh: DotRefresh) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn duration(&self) -> Duration {
        self.tick_length * self.ticks
    }
}

/// What a DoT slot hits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DotTarget {
    Single(TargetId),
    /// Every target, with the AOE cap applied per tick wave
    Area,
}

/// One DoT slot
#[derive(Debug, Clone)]
pub struct DotSlot {
    pub action: ActionId,
    pub target: DotTarget,
    pub school: SpellSchool,
    pub active: bool,
    pub ticks_left: u32,
    pub tick_length: Duration,
    /// Snapshot of per-target tick damage before target-side modifiers
    pub tick_damage: f64,
    pub threat_multiplier: f64,
    pub aoe_cap: Option<f64>,
    pub next_tick: Option<ActionHandle>,
    /// Active time this iteration, closed at every deactivation or restart
    pub uptime: Duration,
    pub uptime_from: Duration,
    pub applications: u32,
}

impl DotSlot {
    fn new(action: ActionId, target: DotTarget, school: SpellSchool) -> Self {
        DotSlot {
            action,
            target,
            school,
            active: false,
            ticks_left: 0,
            tick_length: Duration::ZERO,
            tick_damage: 0.0,
            threat_multiplier: 1.0,
            aoe_cap: None,
            next_tick: None,
            uptime: Duration::ZERO,
            uptime_from: Duration::ZERO,
            applications: 0,
        }
    }

    /// Close the running uptime window at `now`
    pub fn close_uptime(&mut self, now: Duration) {
        if self.active && now > self.uptime_from {
            self.uptime += now - self.uptime_from;
        }
        self.uptime_from = now;
    }
}

/// DoT slots of one caster
#[derive(Debug, Clone, Default)]
pub struct DotTracker {
    slots: Vec<DotSlot>,
    index: HashMap<(ActionKey, DotTarget), usize>,
}

impl DotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot index for a pair, creating the slot on first use
    pub fn slot_for(&mut self, action: ActionId, target: DotTarget, school: SpellSchool) -> usize {
        let key = (action.key(), target);
        if let Some(&slot) = self.index.get(&key) {
            return slot;
        }
        self.slots.push(DotSlot::new(action, target, school));
        self.index.insert(key, self.slots.len() - 1);
        self.slots.len() - 1
    }

    pub fn find(&self, action: ActionId, target: DotTarget) -> Option<&DotSlot> {
        self.index.get(&(action.key(), target)).map(|&i| &self.slots[i])
    }

    pub fn get(&self, slot: usize) -> Option<&DotSlot> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut DotSlot> {
        self.slots.get_mut(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DotSlot> {
        self.slots.iter()
    }

    /// Close every window at the end of an iteration
    pub fn close_uptime(&mut self, now: Duration) {
        for slot in &mut self.slots {
            slot.close_uptime(now);
        }
    }

    /// Deactivate every slot. Pending ticks die with the scheduler reset.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.active = false;
            slot.ticks_left = 0;
            slot.next_tick = None;
            slot.uptime = Duration::ZERO;
            slot.uptime_from = Duration::ZERO;
            slot.applications = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_slot_per_pair() {
        let mut dots = DotTracker::new();
        let a = dots.slot_for(ActionId::spell(1), DotTarget::Single(TargetId(0)), SpellSchool::Shadow);
        let b = dots.slot_for(ActionId::spell(1), DotTarget::Single(TargetId(0)), SpellSchool::Shadow);
        let c = dots.slot_for(ActionId::spell(1), DotTarget::Single(TargetId(1)), SpellSchool::Shadow);
        let d = dots.slot_for(ActionId::spell(1), DotTarget::Area, SpellSchool::Shadow);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(c, d);
    }

    #[test]
    fn test_uptime_window() {
        let mut dots = DotTracker::new();
        let i = dots.slot_for(ActionId::spell(1), DotTarget::Area, SpellSchool::Fire);
        let slot = dots.get_mut(i).unwrap();
        slot.active = true;
        slot.uptime_from = Duration::from_secs(2);
        slot.close_uptime(Duration::from_secs(5));
        slot.close_uptime(Duration::from_secs(7));
        assert_eq!(slot.uptime, Duration::from_secs(5));

        dots.reset();
        assert_eq!(dots.get(i).unwrap().uptime, Duration::ZERO);
    }

    #[test]
    fn test_duration() {
        let input = DotInput::new(5, Duration::from_secs(3), DamageInput::fixed(10.0));
        assert_eq!(input.duration(), Duration::from_secs(15));
        assert_eq!(input.refresh, DotRefresh::Extend);
    }
}
