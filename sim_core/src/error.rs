//! Error types
//!
//! Only setup-time failures are errors. Rotation-visible conditions such as
//! insufficient resource are plain values (see [`crate::combat::CastAttempt`]).

use crate::config::ConfigError;
use thiserror::Error;

/// Degenerate run parameters, rejected before any state is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("iteration count must be at least 1")]
    ZeroIterations,
    #[error("encounter duration must be a positive, representable number of seconds, got {0}")]
    InvalidDuration(f64),
    #[error("encounter has no targets")]
    NoTargets,
    #[error("request has no players")]
    NoPlayers,
    #[error("progress interval must be at least 1 when set")]
    ZeroProgressInterval,
    #[error("weapon swing speed of '{player}' must be positive and finite, got {secs}s")]
    InvalidSwingSpeed { player: String, secs: f64 },
}

/// Failure to build or run a simulation
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("no agent factory registered for spec '{0}'")]
    UnknownSpec(String),
    #[error("invalid options for spec '{tag}': {message}")]
    SpecOptions { tag: String, message: String },
    #[error("combat constants: {0}")]
    Constants(#[from] ConfigError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}
