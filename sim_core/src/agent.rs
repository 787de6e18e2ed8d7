//! Rotation contract
//!
//! Class/spec behavior plugs in through [`Agent`]. The engine calls it at a
//! fixed set of points and never inspects it otherwise.

use crate::character::UnitId;
use crate::combat::HitOutcome;
use crate::sim::Sim;

/// Decision logic for one unit
///
/// `on_gcd_ready` must leave the unit busy: cast something on the GCD, start
/// a hardcast, or call [`Sim::wait_until`] / [`Sim::wait_for_resource`].
/// A unit that does none of these idles for the rest of the iteration.
#[allow(unused_variables)]
pub trait Agent {
    /// Unit this agent drives
    fn unit(&self) -> UnitId;

    /// Called once after every unit is finalized
    fn init(&mut self, sim: &mut Sim) {}

    /// Called at the start of every iteration, after units are reset
    fn reset(&mut self, sim: &mut Sim) {}

    fn on_gcd_ready(&mut self, sim: &mut Sim);

    fn on_resource_tick(&mut self, sim: &mut Sim) {}

    fn on_auto_attack(&mut self, sim: &mut Sim, outcome: HitOutcome) {}
}
