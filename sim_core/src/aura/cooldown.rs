//! Cooldown readiness gates

use stats_core::ActionKey;
use std::collections::HashMap;
use std::time::Duration;

/// Identity of a cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CooldownId {
    /// The unit's global cooldown
    Gcd,
    /// Cooldown of a single action
    Action(ActionKey),
    /// Cooldown shared by several actions (e.g. a potion category)
    Shared(u32),
}

/// Map of cooldown id to the time it becomes ready
///
/// Independent of aura lifetime; an id never seen is ready.
#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    ready_at: HashMap<CooldownId, Duration>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_at(&self, id: CooldownId) -> Duration {
        self.ready_at.get(&id).copied().unwrap_or(Duration::ZERO)
    }

    pub fn is_ready(&self, id: CooldownId, now: Duration) -> bool {
        self.ready_at(id) <= now
    }

    /// Time left until ready, zero when already ready
    pub fn remaining(&self, id: CooldownId, now: Duration) -> Duration {
        self.ready_at(id).saturating_sub(now)
    }

    pub fn set(&mut self, id: CooldownId, ready_at: Duration) {
        self.ready_at.insert(id, ready_at);
    }

    /// Put `id` on cooldown for `length` starting at `now`
    pub fn start(&mut self, id: CooldownId, now: Duration, length: Duration) {
        self.set(id, now.saturating_add(length));
    }

    pub fn reset(&mut self) {
        self.ready_at.clear();
    }
}

/// Hidden re-trigger gate owned by an effect's state object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalCooldown {
    pub length: Duration,
    ready_at: Duration,
}

impl InternalCooldown {
    pub fn new(length: Duration) -> Self {
        InternalCooldown {
            length,
            ready_at: Duration::ZERO,
        }
    }

    pub fn is_ready(&self, now: Duration) -> bool {
        self.ready_at <= now
    }

    pub fn ready_at(&self) -> Duration {
        self.ready_at
    }

    /// Consume the gate if ready. Returns false while cooling down.
    pub fn try_trigger(&mut self, now: Duration) -> bool {
        if !self.is_ready(now) {
            return false;
        }
        self.ready_at = now.saturating_add(self.length);
        true
    }

    pub fn reset(&mut self) {
        self.ready_at = Duration::ZERO;
    }
}
