use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod profile;

pub use profile::{MetadataProfile, ProfileField};

/// Subfolder pattern used when the user never picked one.
pub const DEFAULT_FOLDER_FORMAT: &str = "%Y-%m-%d";

/// Which date decides the subfolder a file is copied into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizeMode {
    /// Wall-clock time at the start of the import run.
    ImportDate,
    /// Capture timestamp embedded in the file.
    #[default]
    ShotDate,
}

impl fmt::Display for OrganizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImportDate => f.write_str("import-date"),
            Self::ShotDate => f.write_str("shot-date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown organization mode '{0}' (expected import-date or shot-date)")]
pub struct UnknownOrganizeMode(pub String);

impl FromStr for OrganizeMode {
    type Err = UnknownOrganizeMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "import" | "import-date" => Ok(Self::ImportDate),
            "shot" | "shot-date" => Ok(Self::ShotDate),
            _ => Err(UnknownOrganizeMode(s.to_string())),
        }
    }
}

/// Where the date used for an item's subfolder came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Embedded capture metadata.
    Capture,
    /// Filesystem modification time, used when capture metadata is missing.
    ModifiedTime,
    /// The shared run start timestamp.
    ImportStart,
}

impl DateSource {
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::ModifiedTime)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Pending,
    Copied,
    MetadataApplied,
    Failed,
}

impl ItemStatus {
    /// True when the file landed at its destination, tagged or not.
    pub fn is_copied(self) -> bool {
        matches!(self, Self::Copied | Self::MetadataApplied)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Copied => "copied",
            Self::MetadataApplied => "tagged",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}
