use core_types::{OrganizeMode, DEFAULT_FOLDER_FORMAT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "PhotoImport";
const APPLICATION: &str = "PhotoImport";
const SETTINGS_FILE_NAME: &str = "settings.json";
const PRESETS_FILE_NAME: &str = "presets.json";

pub const MAX_RECENT_DESTINATIONS: usize = 5;

#[derive(Debug, Error)]
pub enum AppSettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings path unavailable")]
    MissingSettingsPath,
}

pub type Result<T> = std::result::Result<T, AppSettingsError>;

/// How to run ExifTool. Kept as plain text so settings never depend on the
/// metadata crate's types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// `None` means look the tool up on `PATH`.
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    pub minimum_version: String,
    pub timeout_secs: u64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            minimum_version: "10.00".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub last_source: Option<PathBuf>,
    pub last_destination: Option<PathBuf>,
    pub last_backup: Option<PathBuf>,
    /// Most recent first.
    pub recent_destinations: Vec<PathBuf>,
    pub organize_mode: OrganizeMode,
    pub folder_format: String,
    pub exiftool: ToolSettings,
    pub last_preset: Option<String>,
    pub open_destination: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            last_source: None,
            last_destination: None,
            last_backup: None,
            recent_destinations: Vec::new(),
            organize_mode: OrganizeMode::default(),
            folder_format: DEFAULT_FOLDER_FORMAT.to_string(),
            exiftool: ToolSettings::default(),
            last_preset: None,
            open_destination: false,
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        load_impl()
    }

    pub fn save(&self) -> Result<()> {
        save_impl(self)
    }

    /// Reads settings from a JSON file; a missing file gives defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let settings: AppSettings = serde_json::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        debug!(?path, "settings saved");
        Ok(())
    }

    /// Remembers `path` as the last destination and moves it to the front of
    /// the recent list.
    pub fn record_destination(&mut self, path: PathBuf) {
        self.recent_destinations.retain(|existing| existing != &path);
        self.recent_destinations.insert(0, path.clone());
        self.recent_destinations.truncate(MAX_RECENT_DESTINATIONS);
        self.last_destination = Some(path);
    }
}

#[cfg(target_os = "windows")]
const REGISTRY_KEY: &str = "Software\\PhotoImport";
#[cfg(target_os = "windows")]
const REGISTRY_VALUE: &str = "Settings";

#[cfg(target_os = "windows")]
fn load_impl() -> Result<AppSettings> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = hkcu.open_subkey_with_flags(REGISTRY_KEY, KEY_READ).ok();

    if let Some(key) = key {
        if let Ok(payload) = key.get_value::<String, _>(REGISTRY_VALUE) {
            return Ok(serde_json::from_str(&payload)?);
        }
    }

    Ok(AppSettings::default())
}

#[cfg(target_os = "windows")]
fn save_impl(settings: &AppSettings) -> Result<()> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_WRITE};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey_with_flags(REGISTRY_KEY, KEY_WRITE)?;
    let payload = serde_json::to_string(settings)?;
    key.set_value(REGISTRY_VALUE, &payload)?;
    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn load_impl() -> Result<AppSettings> {
    AppSettings::load_from(&settings_file_path()?)
}

#[cfg(not(target_os = "windows"))]
fn save_impl(settings: &AppSettings) -> Result<()> {
    settings.save_to(&settings_file_path()?)
}

fn config_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .ok_or(AppSettingsError::MissingSettingsPath)?;
    Ok(dirs.config_dir().to_path_buf())
}

pub fn settings_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE_NAME))
}

/// Where the preset store lives, next to the settings file.
pub fn presets_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(PRESETS_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let settings = AppSettings::load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.folder_format, "%Y-%m-%d");
        assert_eq!(settings.exiftool.timeout_secs, 30);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = AppSettings {
            organize_mode: OrganizeMode::ImportDate,
            last_preset: Some("Helios".into()),
            open_destination: true,
            ..AppSettings::default()
        };
        settings.exiftool.args = vec!["/opt/exiftool/exiftool".into()];
        settings.record_destination(PathBuf::from("/photos"));
        settings.save_to(&path).unwrap();

        assert_eq!(AppSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn older_files_fill_in_new_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"last_destination":"/photos","exiftool":{"timeout_secs":5}}"#)
            .unwrap();

        let settings = AppSettings::load_from(&path).unwrap();
        assert_eq!(settings.last_destination, Some(PathBuf::from("/photos")));
        assert_eq!(settings.exiftool.timeout_secs, 5);
        assert_eq!(settings.exiftool.minimum_version, "10.00");
        assert_eq!(settings.organize_mode, OrganizeMode::ShotDate);
    }

    #[test]
    fn recent_destinations_are_unique_and_capped() {
        let mut settings = AppSettings::default();
        for i in 0..7 {
            settings.record_destination(PathBuf::from(format!("/photos/{i}")));
        }
        settings.record_destination(PathBuf::from("/photos/3"));

        assert_eq!(settings.recent_destinations.len(), MAX_RECENT_DESTINATIONS);
        assert_eq!(settings.recent_destinations[0], PathBuf::from("/photos/3"));
        assert_eq!(settings.recent_destinations[1], PathBuf::from("/photos/6"));
        assert_eq!(
            settings
                .recent_destinations
                .iter()
                .filter(|p| p.as_path() == Path::new("/photos/3"))
                .count(),
            1
        );
        assert_eq!(settings.last_destination, Some(PathBuf::from("/photos/3")));
    }
}
