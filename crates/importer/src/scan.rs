use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::{ImportError, Result};

/// Lower-case extensions picked up when a whole folder is chosen as source.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tif", "tiff", "heic", "heif", "dng", "cr2", "cr3", "nef", "arw", "raf",
    "rw2", "orf",
];

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(ext))
}

/// Lists the importable files in `dir`, sorted by path so runs are
/// repeatable. Unreadable entries are logged and skipped.
pub fn scan_source_folder(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ImportError::Configuration(format!(
            "source folder {} does not exist",
            dir.display()
        )));
    }

    let mut walker = WalkDir::new(dir).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut out = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(%err, "skipping unreadable entry while scanning");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        // macOS resource forks left on FAT-formatted cards.
        let apple_double = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with("._"));
        if apple_double {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(is_supported_extension);
        if supported {
            out.push(entry.into_path());
        }
    }

    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn extension_check_ignores_case() {
        assert!(is_supported_extension("JPG"));
        assert!(is_supported_extension("Cr3"));
        assert!(!is_supported_extension("xmp"));
        assert!(!is_supported_extension(""));
    }

    #[test]
    fn scan_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["b.NEF", "a.jpg", "notes.txt", "._a.jpg", "c.xmp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("d.dng"), b"x").unwrap();

        let flat = scan_source_folder(dir.path(), false).unwrap();
        assert_eq!(
            flat,
            vec![dir.path().join("a.jpg"), dir.path().join("b.NEF")]
        );

        let deep = scan_source_folder(dir.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&dir.path().join("sub").join("d.dng")));
    }

    #[test]
    fn missing_folder_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let err = scan_source_folder(&dir.path().join("card"), true).unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }
}
