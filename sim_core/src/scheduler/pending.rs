//! Pending actions and their pool

use crate::character::UnitId;
use crate::sim::Sim;
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Dispatch tier for actions due at the same instant; lower runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Global-cooldown loop
    Gcd,
    /// Everything else
    Default,
}

/// What happens when a pending action fires
pub enum ActionKind {
    /// A unit's global cooldown is over
    Gcd(UnitId),
    /// A unit's in-flight cast finishes
    HardcastComplete(UnitId),
    /// Periodic resource notification
    ResourceTick(UnitId),
    /// Weapon swing timer
    AutoAttack(UnitId),
    /// Next tick of a damage-over-time slot
    DotTick { unit: UnitId, slot: usize },
    /// Arbitrary callback
    Callback(Box<dyn FnOnce(&mut Sim)>),
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Gcd(u) => write!(f, "Gcd({})", u),
            ActionKind::HardcastComplete(u) => write!(f, "HardcastComplete({})", u),
            ActionKind::ResourceTick(u) => write!(f, "ResourceTick({})", u),
            ActionKind::AutoAttack(u) => write!(f, "AutoAttack({})", u),
            ActionKind::DotTick { unit, slot } => write!(f, "DotTick({}, slot {})", unit, slot),
            ActionKind::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// Reference to a scheduled action, valid until it fires or the queue is cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

/// A scheduled callback occupying one pool slot
pub(crate) struct PendingAction {
    pub at: Duration,
    pub priority: Priority,
    pub cancelled: bool,
    pub kind: ActionKind,
}

/// Pool slot; the generation bumps every time the slot is released
#[derive(Default)]
pub(crate) struct Slot {
    pub generation: u32,
    pub action: Option<PendingAction>,
}

/// Heap key: (time, priority, sequence). The sequence counter makes the
/// order total, so equal-time equal-priority actions fire in scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueKey {
    pub at: Duration,
    pub priority: Priority,
    pub seq: u64,
    pub slot: u32,
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap and we want the earliest first.
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
