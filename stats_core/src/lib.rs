//! stats_core - Value types shared by the simulation engine
//!
//! This library provides:
//! - Stat / Stats: the stat enum and dense stat vector
//! - ActionId / ActionKey: identities for abilities, items and effects
//! - StatDependencyManager: derived-stat graph resolved once at finalize

pub mod action;
pub mod dependency;
pub mod types;

pub use action::{ActionId, ActionKey, ActionSource, OtherAction};
pub use dependency::{StatDependency, StatDependencyManager, StatModifier};
pub use types::{SpellSchool, Stat, StatMap, Stats};
