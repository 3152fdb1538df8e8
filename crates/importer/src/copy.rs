use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io;
use std::path::Path;

use filetime::{set_file_handle_times, FileTime};
use tempfile::{Builder, NamedTempFile};
use tracing::warn;

/// First name not taken in any of `dirs`: `IMG_0001.JPG`, then
/// `IMG_0001_1.JPG`, `IMG_0001_2.JPG`, ...
///
/// Checking every directory keeps the primary and backup copies under the
/// same name.
pub(crate) fn available_name(file_name: &OsStr, dirs: &[&Path]) -> OsString {
    let free = |name: &OsStr| dirs.iter().all(|dir| !dir.join(name).exists());
    if free(file_name) {
        return file_name.to_os_string();
    }

    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().unwrap_or(file_name);
    let extension = as_path.extension();
    let mut counter = 1u32;
    loop {
        let mut candidate = stem.to_os_string();
        candidate.push(format!("_{counter}"));
        if let Some(extension) = extension {
            candidate.push(".");
            candidate.push(extension);
        }
        if free(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Copies `source` to `target` through a temporary file in the target
/// directory, so `target` either appears complete or not at all.
///
/// Access and modification times are carried over where the platform
/// allows. An existing `target` is never replaced.
pub(crate) fn copy_atomic(source: &Path, target: &Path) -> io::Result<()> {
    let dir = target.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "target has no parent folder")
    })?;
    if target.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", target.display()),
        ));
    }

    let mut reader = File::open(source)?;
    let source_meta = reader.metadata()?;
    if !source_meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", source.display()),
        ));
    }

    // Dropping `tmp` on any early return removes the partial file.
    let mut tmp = Builder::new()
        .prefix(".importing-")
        .suffix(".part")
        .tempfile_in(dir)?;
    io::copy(&mut reader, tmp.as_file_mut())?;
    tmp.as_file().set_permissions(writable(source_meta.permissions()))?;

    let atime = FileTime::from_last_access_time(&source_meta);
    let mtime = FileTime::from_last_modification_time(&source_meta);
    if let Err(err) = set_file_handle_times(tmp.as_file(), Some(atime), Some(mtime)) {
        warn!(?target, %err, "could not preserve file times");
    }
    tmp.as_file().sync_all()?;

    persist_new(tmp, target)
}

/// Moves a finished temporary file into place, failing with
/// `AlreadyExists` if something else took `target` in the meantime.
fn persist_new(tmp: NamedTempFile, target: &Path) -> io::Result<()> {
    tmp.persist_noclobber(target).map_err(|err| err.error)?;
    Ok(())
}

/// Cards often mark files read-only; copies must stay writable so the
/// metadata tool can update them.
fn writable(mut permissions: fs::Permissions) -> fs::Permissions {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    {
        permissions.set_readonly(false);
    }
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn free_name_is_kept() {
        let dir = tempdir().unwrap();
        let name = available_name(OsStr::new("IMG_0001.JPG"), &[dir.path()]);
        assert_eq!(name, "IMG_0001.JPG");
    }

    #[test]
    fn taken_names_get_counter_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("IMG_0001.JPG"), b"a").unwrap();
        fs::write(dir.path().join("IMG_0001_1.JPG"), b"b").unwrap();

        let name = available_name(OsStr::new("IMG_0001.JPG"), &[dir.path()]);
        assert_eq!(name, "IMG_0001_2.JPG");
    }

    #[test]
    fn name_must_be_free_in_every_folder() {
        let primary = tempdir().unwrap();
        let backup = tempdir().unwrap();
        fs::write(backup.path().join("DSC_0042.NEF"), b"stale").unwrap();

        let name = available_name(
            OsStr::new("DSC_0042.NEF"),
            &[primary.path(), backup.path()],
        );
        assert_eq!(name, "DSC_0042_1.NEF");
    }

    #[test]
    fn names_without_extension() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("README"), b"x").unwrap();
        assert_eq!(
            available_name(OsStr::new("README"), &[dir.path()]),
            "README_1"
        );
    }

    #[test]
    fn copy_preserves_bytes_and_mtime() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src.jpg");
        let payload: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
        fs::write(&source, &payload).unwrap();
        let old = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&source, old).unwrap();

        let target = dir.path().join("out").join("src.jpg");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        copy_atomic(&source, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), payload);
        let copied = FileTime::from_last_modification_time(&fs::metadata(&target).unwrap());
        assert_eq!(copied.unix_seconds(), old.unix_seconds());
    }

    #[test]
    fn never_overwrites_existing_target() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("new.jpg");
        let target = dir.path().join("old.jpg");
        fs::write(&source, b"new").unwrap();
        fs::write(&target, b"old").unwrap();

        let err = copy_atomic(&source, &target).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }

    #[test]
    fn target_taken_after_the_check_is_left_alone() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("IMG_0001.JPG");
        let mut tmp = Builder::new().suffix(".part").tempfile_in(dir.path()).unwrap();
        io::Write::write_all(tmp.as_file_mut(), b"new").unwrap();
        fs::write(&target, b"raced in").unwrap();

        let err = persist_new(tmp, &target).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"raced in");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_copy_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("not-a-file");
        fs::create_dir(&source).unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        assert!(copy_atomic(&source, &out.join("not-a-file")).is_err());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }
}
