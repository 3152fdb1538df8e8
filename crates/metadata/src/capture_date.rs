use std::fs;
use std::io::{self, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;
use exif::{Exif, In, Reader, Tag, Value as ExifValue};
use thiserror::Error;
use tracing::debug;

use crate::embedded::find_embedded_exif;

/// Tags consulted for the shot date, best first. `DateTimeDigitized` is what
/// ExifTool reports as `CreateDate`.
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

#[derive(Debug, Error)]
pub enum CaptureDateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("EXIF parse error: {0}")]
    Exif(#[from] exif::Error),
}

/// Reads the capture timestamp embedded in `path`.
///
/// `Ok(None)` means the file has no usable date tag; `Err` means the metadata
/// could not be read at all. Timestamps are camera local time, as recorded.
pub fn read_capture_date(path: &Path) -> Result<Option<NaiveDateTime>, CaptureDateError> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(err) => match find_embedded_exif(path)? {
            Some(segment) => {
                debug!(?path, %err, "reading EXIF from embedded preview");
                Reader::new().read_raw(segment)?
            }
            None => return Err(err.into()),
        },
    };
    Ok(capture_date_from(&exif))
}

fn capture_date_from(exif: &Exif) -> Option<NaiveDateTime> {
    DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        parse_exif_datetime(&field.value)
    })
}

fn exif_string(value: &ExifValue) -> Option<String> {
    match value {
        ExifValue::Ascii(values) => values
            .first()
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .map(|s| s.trim_matches('\u{0}').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn parse_exif_datetime(value: &ExifValue) -> Option<NaiveDateTime> {
    let raw = exif_string(value)?;
    NaiveDateTime::parse_from_str(&raw, "%Y:%m:%d %H:%M:%S").ok()
}
