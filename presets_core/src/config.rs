use crate::LoadError;
use serde::Deserialize;
use sim_core::SimRequest;
use std::path::Path;

/// `[preset]` table at the top of a preset file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresetHeader {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl PresetHeader {
    /// Ids are used as lookup keys and on command lines
    fn is_valid_id(&self) -> bool {
        !self.id.is_empty() && !self.id.chars().any(char::is_whitespace)
    }
}

/// Load and validate a single request file
pub fn load_request(path: &Path) -> Result<SimRequest, LoadError> {
    let content = read(path)?;
    let request = toml::from_str(&content).map_err(|source| syntax(path, source))?;
    checked(request, path)
}

/// Split a preset file into its header and request body
pub(crate) fn parse_preset(content: &str, path: &Path) -> Result<(PresetHeader, SimRequest), LoadError> {
    let mut body: toml::Table = toml::from_str(content).map_err(|source| syntax(path, source))?;
    let header: PresetHeader = body
        .remove("preset")
        .ok_or_else(|| LoadError::MissingHeader {
            path: path.to_path_buf(),
        })?
        .try_into()
        .map_err(|source| syntax(path, source))?;
    if !header.is_valid_id() {
        return Err(LoadError::InvalidId {
            path: path.to_path_buf(),
            id: header.id,
        });
    }

    let request = toml::Value::Table(body)
        .try_into()
        .map_err(|source| syntax(path, source))?;
    Ok((header, checked(request, path)?))
}

pub(crate) fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn syntax(path: &Path, source: toml::de::Error) -> LoadError {
    LoadError::Syntax {
        path: path.to_path_buf(),
        source,
    }
}

fn checked(request: SimRequest, path: &Path) -> Result<SimRequest, LoadError> {
    match request.validate() {
        Ok(()) => Ok(request),
        Err(source) => Err(LoadError::InvalidRequest {
            path: path.to_path_buf(),
            source,
        }),
    }
}
