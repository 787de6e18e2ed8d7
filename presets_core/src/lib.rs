//! presets_core - File-facing simulation configuration
//!
//! Loads [`SimRequest`]s from TOML: a single request file with
//! [`load_request`], or a directory of named presets with
//! [`PresetRegistry`].

mod config;
mod registry;

pub use config::{load_request, PresetHeader};
pub use registry::{Preset, PresetRegistry};

pub use sim_core::SimRequest;

use sim_core::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to load a request or preset file
///
/// Every variant names the file it came from.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not valid request TOML: {source}", path.display())]
    Syntax {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{} has no [preset] table", path.display())]
    MissingHeader { path: PathBuf },
    #[error("{} declares unusable preset id '{id}'", path.display())]
    InvalidId { path: PathBuf, id: String },
    #[error("{} describes an invalid run: {source}", path.display())]
    InvalidRequest {
        path: PathBuf,
        source: ValidationError,
    },
    #[error("preset '{id}' is defined by both {} and {}", first.display(), second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Lookup of a preset id that was never loaded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PresetError {
    #[error("no preset with id '{0}'")]
    UnknownPreset(String),
}
