//! sim_core - Discrete-event combat simulation engine
//!
//! This library provides:
//! - Scheduler: time-ordered pending actions with lazy cancellation
//! - AuraTracker / CooldownTracker: temporal effects and their uptime
//! - Character: stat sheet, resource pool and cast state of one unit
//! - Combat resolution: attack tables, damage pipeline and DoT slots
//! - Metrics: streaming per-action, per-aura and distribution statistics
//! - Driver: deterministic multi-iteration runs on a worker pool
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sim_core::prelude::*;
//!
//! let mut registry = Registry::new();
//! registry.register_spec("fire_mage", |setup: &mut UnitSetup<'_>, options: MageOptions| {
//!     Box::new(FireMage::new(setup.unit(), options)) as Box<dyn Agent>
//! });
//!
//! let request: SimRequest = toml::from_str(&std::fs::read_to_string("mage.toml")?)?;
//! let result = run_sim(&request, &registry)?;
//! println!("{:.1} DPS", result.raid.mean);
//! ```

pub mod agent;
pub mod aura;
pub mod character;
pub mod combat;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod result;
pub mod rng;
pub mod scheduler;
pub mod sim;
pub mod simulation;
pub mod target;

#[cfg(test)]
mod test_support;

// Core API - what most users need
pub use driver::{run_sim, run_sim_with, ProgressUpdate, RunControl};
pub use request::{EncounterConfig, EquippedItem, PlayerConfig, SimOptions, SimRequest, SpecOptions};
pub use result::{DotSummary, SimResult, TargetResult, UnitResult};
pub use error::{SimError, ValidationError};

// Plugging in rotations and items
pub use agent::Agent;
pub use registry::{Registry, UnitSetup};
pub use sim::Sim;
pub use simulation::Simulation;

// Combat building blocks
pub use aura::{Aura, AuraContext, AuraEffect, AuraHooks, AuraId, InternalCooldown, ReapplyPolicy};
pub use character::{Character, UnitId, Weapon};
pub use combat::{Cast, CastAttempt, DamageInput, DotInput, DotRefresh, DotTarget, HitOutcome, HitResult};
pub use target::{TargetConfig, TargetId};

// Configuration
pub use config::{CombatConstants, ConfigError};

// Re-export the shared value types
pub use stats_core::{ActionId, OtherAction, SpellSchool, Stat, StatMap, Stats};
