//! Prelude module for convenient imports
//!
//! ```rust
//! use sim_core::prelude::*;
//! ```

// Running simulations
pub use crate::driver::{run_sim, run_sim_with, ProgressUpdate, RunControl};
pub use crate::request::{EncounterConfig, EquippedItem, PlayerConfig, SimOptions, SimRequest, SpecOptions};
pub use crate::result::{SimResult, UnitResult};
pub use crate::error::SimError;

// Writing rotations
pub use crate::agent::Agent;
pub use crate::registry::{Registry, UnitSetup};
pub use crate::sim::Sim;

// Casts and effects
pub use crate::aura::{Aura, AuraContext, AuraHooks, InternalCooldown, ReapplyPolicy};
pub use crate::character::{UnitId, Weapon};
pub use crate::combat::{Cast, CastAttempt, DamageInput, DotInput, DotRefresh, DotTarget, HitOutcome, HitResult, ModifierSource, PowerSource};
pub use crate::target::{TargetConfig, TargetId};

// Re-exports from stats_core
pub use stats_core::{ActionId, SpellSchool, Stat, Stats};
