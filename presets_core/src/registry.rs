use crate::config::{parse_preset, read, PresetHeader};
use crate::{LoadError, PresetError};
use sim_core::SimRequest;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A named request loaded from disk
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub header: PresetHeader,
    pub request: SimRequest,
    pub path: PathBuf,
}

/// Every preset found under a directory, keyed by id
#[derive(Debug, Default)]
pub struct PresetRegistry {
    presets: BTreeMap<String, Preset>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every preset under `dir`, subdirectories included
    ///
    /// Files are read in path order, so a duplicate id is always reported
    /// against the same pair of files. A missing directory holds no presets.
    pub fn load(dir: &Path) -> Result<Self, LoadError> {
        let mut registry = Self::new();
        for path in preset_files(dir)? {
            registry.insert(&path)?;
        }
        info!(presets = registry.presets.len(), dir = ?dir, "presets loaded");
        Ok(registry)
    }

    fn insert(&mut self, path: &Path) -> Result<(), LoadError> {
        let (header, request) = parse_preset(&read(path)?, path)?;
        match self.presets.entry(header.id.clone()) {
            Entry::Occupied(existing) => Err(LoadError::DuplicateId {
                id: header.id,
                first: existing.get().path.clone(),
                second: path.to_path_buf(),
            }),
            Entry::Vacant(slot) => {
                debug!(id = %header.id, path = ?path, "preset loaded");
                slot.insert(Preset {
                    header,
                    request,
                    path: path.to_path_buf(),
                });
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Preset> {
        self.presets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.presets.contains_key(id)
    }

    /// Preset ids in sorted order
    pub fn preset_ids(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(|s| s.as_str())
    }

    /// Copy of a preset's request, ready to adjust and run
    pub fn request(&self, id: &str) -> Result<SimRequest, PresetError> {
        self.get(id)
            .map(|p| p.request.clone())
            .ok_or_else(|| PresetError::UnknownPreset(id.to_string()))
    }
}

/// Every `*.toml` file below `root`, sorted by path
///
/// Hidden entries (editor swap files, `.git`) are skipped.
fn preset_files(root: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let unreadable = |source| LoadError::Read {
            path: dir.clone(),
            source,
        };
        for entry in std::fs::read_dir(&dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                dirs.push(path);
            } else if path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
