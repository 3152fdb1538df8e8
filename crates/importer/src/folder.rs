use std::fmt::Write;
use std::path::{Component, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};

use crate::{ImportError, Result};

/// A strftime-style pattern naming the date subfolders, e.g. `%Y-%m-%d`.
/// `/` in the pattern nests folders (`%Y/%m-%d`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFormat {
    pattern: String,
}

impl FolderFormat {
    /// Rejects patterns with unknown tokens and patterns that would render
    /// outside the root (empty, absolute or containing `..`).
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(ImportError::Configuration(
                "folder date format is empty".to_string(),
            ));
        }
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return Err(ImportError::Configuration(format!(
                "folder date format '{pattern}' contains an unknown token"
            )));
        }

        let format = Self {
            pattern: pattern.to_string(),
        };
        let sample = NaiveDate::from_ymd_opt(2024, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .ok_or_else(|| ImportError::Configuration("invalid sample date".to_string()))?;
        format.subfolder(&sample)?;
        Ok(format)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The relative subfolder for `date`.
    pub fn subfolder(&self, date: &NaiveDateTime) -> Result<PathBuf> {
        let mut rendered = String::new();
        write!(rendered, "{}", date.format(&self.pattern)).map_err(|_| {
            ImportError::Configuration(format!(
                "folder date format '{}' cannot be applied to a local date",
                self.pattern
            ))
        })?;

        let path = PathBuf::from(rendered.trim());
        let relative = !path.as_os_str().is_empty()
            && path
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !relative {
            return Err(ImportError::Configuration(format!(
                "folder date format '{}' renders to '{}', which is not a subfolder name",
                self.pattern, rendered
            )));
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    #[test]
    fn renders_default_pattern() {
        let format = FolderFormat::parse("%Y-%m-%d").unwrap();
        assert_eq!(
            format.subfolder(&date(2024, 3, 1)).unwrap(),
            Path::new("2024-03-01")
        );
    }

    #[test]
    fn slashes_nest_folders() {
        let format = FolderFormat::parse("%Y/%m-%b").unwrap();
        assert_eq!(
            format.subfolder(&date(2024, 5, 10)).unwrap(),
            Path::new("2024").join("05-May")
        );
    }

    #[test]
    fn rejects_unknown_tokens_and_escapes() {
        assert!(FolderFormat::parse("%Y-%Q").is_err());
        assert!(FolderFormat::parse("").is_err());
        assert!(FolderFormat::parse("../%Y").is_err());
        assert!(FolderFormat::parse("/%Y").is_err());
    }

    #[test]
    fn rejects_offsets_that_a_local_date_cannot_render() {
        let err = FolderFormat::parse("%Y %z").unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }
}
