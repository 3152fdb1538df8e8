use std::fs;
use std::path::{Path, PathBuf};

use core_types::{MetadataProfile, OrganizeMode, DEFAULT_FOLDER_FORMAT};

use crate::{ImportError, Result};

/// Everything one import run needs. Not modified once handed to the pipeline.
///
/// A present `profile` is what turns tagging on; there is no separate flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Processed in this order.
    pub sources: Vec<PathBuf>,
    pub destination: PathBuf,
    pub backup: Option<PathBuf>,
    pub mode: OrganizeMode,
    pub folder_format: String,
    pub profile: Option<MetadataProfile>,
    /// Honoured by the front end once the run is over.
    pub open_destination: bool,
}

impl ImportRequest {
    pub fn new(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
            backup: None,
            mode: OrganizeMode::default(),
            folder_format: DEFAULT_FOLDER_FORMAT.to_string(),
            profile: None,
            open_destination: false,
        }
    }

    pub fn with_backup(mut self, backup: impl Into<PathBuf>) -> Self {
        self.backup = Some(backup.into());
        self
    }

    pub fn with_mode(mut self, mode: OrganizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_folder_format(mut self, format: impl Into<String>) -> Self {
        self.folder_format = format.into();
        self
    }

    pub fn with_profile(mut self, profile: MetadataProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Creates the roots if needed and checks they are writable folders and
    /// not the same place.
    pub(crate) fn prepare_roots(&self) -> Result<()> {
        prepare_root(&self.destination, "destination")?;
        if let Some(backup) = &self.backup {
            prepare_root(backup, "backup")?;
            if canonical(&self.destination)? == canonical(backup)? {
                return Err(ImportError::Configuration(format!(
                    "backup folder {} is the same as the destination",
                    backup.display()
                )));
            }
        }
        Ok(())
    }
}

fn prepare_root(root: &Path, role: &str) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(ImportError::Configuration(format!("{role} folder is not set")));
    }
    fs::create_dir_all(root).map_err(|err| {
        ImportError::Configuration(format!(
            "cannot create {role} folder {}: {err}",
            root.display()
        ))
    })?;
    tempfile::tempfile_in(root).map_err(|err| {
        ImportError::Configuration(format!(
            "{role} folder {} is not writable: {err}",
            root.display()
        ))
    })?;
    Ok(())
}

fn canonical(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|err| {
        ImportError::Configuration(format!("cannot resolve {}: {err}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_roots_are_created() {
        let dir = tempdir().unwrap();
        let request = ImportRequest::new(vec![], dir.path().join("photos"))
            .with_backup(dir.path().join("mirror"));
        request.prepare_roots().unwrap();
        assert!(dir.path().join("photos").is_dir());
        assert!(dir.path().join("mirror").is_dir());
    }

    #[test]
    fn file_in_place_of_destination_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("photos");
        fs::write(&blocker, b"not a folder").unwrap();

        let err = ImportRequest::new(vec![], &blocker)
            .prepare_roots()
            .unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn backup_must_differ_from_destination() {
        let dir = tempdir().unwrap();
        let photos = dir.path().join("photos");
        let same = dir.path().join("photos").join("..").join("photos");

        let err = ImportRequest::new(vec![], &photos)
            .with_backup(same)
            .prepare_roots()
            .unwrap_err();
        assert!(err.to_string().contains("same as the destination"));
    }
}
