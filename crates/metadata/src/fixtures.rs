//! Minimal JPEG files carrying EXIF date tags, for tests.

const DATE_TIME_ORIGINAL: u16 = 0x9003;
const EXIF_IFD_POINTER: u16 = 0x8769;
const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

/// A JPEG whose Exif IFD holds `DateTimeOriginal = datetime`
/// (`YYYY:MM:DD HH:MM:SS`).
pub fn jpeg_with_capture_date(datetime: &str) -> Vec<u8> {
    jpeg_with_exif_dates(&[(DATE_TIME_ORIGINAL, datetime)])
}

/// A JPEG whose Exif IFD holds the given ASCII tags, in order.
pub fn jpeg_with_exif_dates(entries: &[(u16, &str)]) -> Vec<u8> {
    let tiff = tiff_block(entries);
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    let segment_len = (2 + 6 + tiff.len()) as u16;
    jpeg.extend_from_slice(&segment_len.to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&tiff);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

fn tiff_block(entries: &[(u16, &str)]) -> Vec<u8> {
    const IFD0_OFFSET: u32 = 8;
    const EXIF_IFD_OFFSET: u32 = IFD0_OFFSET + 2 + 12 + 4;
    let values_offset = EXIF_IFD_OFFSET + 2 + 12 * entries.len() as u32 + 4;

    let mut out = Vec::new();
    out.extend_from_slice(b"II*\0");
    out.extend_from_slice(&IFD0_OFFSET.to_le_bytes());

    out.extend_from_slice(&1u16.to_le_bytes());
    push_entry(&mut out, EXIF_IFD_POINTER, TYPE_LONG, 1, EXIF_IFD_OFFSET);
    out.extend_from_slice(&0u32.to_le_bytes());

    let mut values = Vec::new();
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (tag, text) in entries {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        while value.len() <= 4 {
            value.push(0);
        }
        let offset = values_offset + values.len() as u32;
        push_entry(&mut out, *tag, TYPE_ASCII, value.len() as u32, offset);
        values.extend_from_slice(&value);
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&values);
    out
}

fn push_entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&value.to_le_bytes());
}
