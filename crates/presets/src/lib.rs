//! Named metadata profiles persisted as a small JSON document.
//!
//! The file is meant to survive being hand-edited or deleted: a missing file
//! is an empty store, and an unreadable one degrades to an empty store with
//! the problem reported through [`PresetStore::load_error`].

use core_types::MetadataProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const PRESETS_FILE_NAME: &str = "presets.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Preset file {path} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Preset serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No preset named '{0}'")]
    NotFound(String),

    #[error("Preset name must not be blank")]
    InvalidName,
}

pub type Result<T> = std::result::Result<T, PresetError>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default = "format_version")]
    version: u32,
    #[serde(default)]
    presets: BTreeMap<String, StoredPreset>,
}

fn format_version() -> u32 {
    FORMAT_VERSION
}

/// On-disk shape of a profile; the name lives in the map key.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPreset {
    #[serde(default)]
    lens_make: String,
    #[serde(default)]
    lens_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lens_serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    focal_length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aperture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl StoredPreset {
    fn into_profile(self, name: String) -> MetadataProfile {
        MetadataProfile {
            name,
            lens_make: self.lens_make,
            lens_model: self.lens_model,
            lens_serial: self.lens_serial,
            focal_length: self.focal_length,
            aperture: self.aperture,
            notes: self.notes,
        }
    }
}

impl From<&MetadataProfile> for StoredPreset {
    fn from(profile: &MetadataProfile) -> Self {
        Self {
            lens_make: profile.lens_make.clone(),
            lens_model: profile.lens_model.clone(),
            lens_serial: profile.lens_serial.clone(),
            focal_length: profile.focal_length.clone(),
            aperture: profile.aperture.clone(),
            notes: profile.notes.clone(),
        }
    }
}

#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    presets: BTreeMap<String, MetadataProfile>,
    load_error: Option<PresetError>,
    /// The file on disk could not be read; keep a copy before replacing it.
    backup_before_write: bool,
}

impl PresetStore {
    /// Opens the store at `path`. Never fails; see [`PresetStore::load_error`].
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self {
            path: path.into(),
            presets: BTreeMap::new(),
            load_error: None,
            backup_before_write: false,
        };
        store.reload();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The recoverable problem hit while reading the file, if any.
    pub fn load_error(&self) -> Option<&PresetError> {
        self.load_error.as_ref()
    }

    /// Re-reads the file, picking up hand edits.
    pub fn reload(&mut self) {
        self.backup_before_write = false;
        match read_presets(&self.path) {
            Ok(presets) => {
                debug!(path = ?self.path, count = presets.len(), "presets loaded");
                self.presets = presets;
                self.load_error = None;
            }
            Err(err) => {
                warn!(path = ?self.path, %err, "preset file unreadable, starting empty");
                self.backup_before_write = true;
                self.presets = BTreeMap::new();
                self.load_error = Some(err);
            }
        }
    }

    /// Profile names in ascending order.
    pub fn list(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn load(&self, name: &str) -> Result<MetadataProfile> {
        self.presets
            .get(name)
            .cloned()
            .ok_or_else(|| PresetError::NotFound(name.to_string()))
    }

    /// Creates or replaces the profile with the same name.
    pub fn save(&mut self, profile: MetadataProfile) -> Result<()> {
        if profile.name.trim().is_empty() {
            return Err(PresetError::InvalidName);
        }
        let mut next = self.presets.clone();
        let name = profile.name.clone();
        next.insert(name.clone(), profile);
        self.persist(&next)?;
        self.presets = next;
        info!(%name, "preset saved");
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        if !self.presets.contains_key(name) {
            return Err(PresetError::NotFound(name.to_string()));
        }
        let mut next = self.presets.clone();
        next.remove(name);
        self.persist(&next)?;
        self.presets = next;
        info!(%name, "preset deleted");
        Ok(())
    }

    fn persist(&mut self, presets: &BTreeMap<String, MetadataProfile>) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        // A failed copy stops the save, so an unreadable file is never replaced.
        if self.backup_before_write {
            let backup = backup_path(&self.path);
            fs::copy(&self.path, &backup)?;
            warn!(?backup, "kept a copy of the unreadable preset file");
            self.backup_before_write = false;
        }

        let file = PresetFile {
            version: FORMAT_VERSION,
            presets: presets
                .iter()
                .map(|(name, profile)| (name.clone(), StoredPreset::from(profile)))
                .collect(),
        };
        let payload = serde_json::to_string_pretty(&file)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(payload.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        self.load_error = None;
        Ok(())
    }
}

fn read_presets(path: &Path) -> Result<BTreeMap<String, MetadataProfile>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(err.into()),
    };
    let content = String::from_utf8(bytes).map_err(|err| PresetError::Corrupt {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    let file: PresetFile = serde_json::from_str(&content).map_err(|err| PresetError::Corrupt {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    if file.version > FORMAT_VERSION {
        warn!(version = file.version, "preset file written by a newer version");
    }

    Ok(file
        .presets
        .into_iter()
        .map(|(name, stored)| (name.clone(), stored.into_profile(name)))
        .collect())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from(PRESETS_FILE_NAME));
    name.push(".bak");
    path.with_file_name(name)
}
