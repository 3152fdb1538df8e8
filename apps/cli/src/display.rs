use std::io;
use std::path::Path;
use std::process::Command;

/// Keeps the end of a long path, which is the part that tells files apart.
pub fn truncate_path(path: &Path, max_len: usize) -> String {
    let text = path.display().to_string();
    let len = text.chars().count();
    if len <= max_len {
        return text;
    }
    let keep = max_len.saturating_sub(3);
    let tail: String = text.chars().skip(len - keep).collect();
    format!("...{tail}")
}

/// Opens `path` in the platform file manager without waiting for it.
pub fn open_folder(path: &Path) -> io::Result<()> {
    let program = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Command::new(program).arg(path).spawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_paths_are_untouched() {
        assert_eq!(truncate_path(Path::new("/card/A.jpg"), 50), "/card/A.jpg");
    }

    #[test]
    fn long_paths_keep_their_tail() {
        let path = Path::new("/media/user/EOS_DIGITAL/DCIM/100CANON/IMG_0001.CR3");
        let short = truncate_path(path, 20);
        assert_eq!(short.chars().count(), 20);
        assert_eq!(short, "...ANON/IMG_0001.CR3");
    }
}
