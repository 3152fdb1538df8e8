//! Fallback for RAW containers the EXIF reader does not parse (CR3, RAF, ...):
//! cameras embed a JPEG preview that carries a copy of the EXIF block.

use std::fs;
use std::io;
use std::path::Path;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Returns the TIFF payload of the first EXIF segment found in the embedded
/// JPEG previews of `path`, trying the largest preview first.
pub(crate) fn find_embedded_exif(path: &Path) -> io::Result<Option<Vec<u8>>> {
    let data = fs::read(path)?;
    let mut previews = embedded_jpegs(&data);
    previews.sort_by_key(|jpeg| std::cmp::Reverse(jpeg.len()));
    Ok(previews.into_iter().find_map(exif_segment).map(<[u8]>::to_vec))
}

fn embedded_jpegs(data: &[u8]) -> Vec<&[u8]> {
    let mut found = Vec::new();
    let mut idx = 0;
    while let Some(start) = find_marker(data, idx, SOI) {
        match find_marker(data, start + 2, EOI) {
            Some(end) => {
                found.push(&data[start..end + 2]);
                idx = end + 2;
            }
            None => break,
        }
    }
    found
}

fn find_marker(data: &[u8], from: usize, marker: [u8; 2]) -> Option<usize> {
    data.get(from..)?
        .windows(2)
        .position(|pair| pair == marker)
        .map(|offset| from + offset)
}

/// Walks the JPEG segment list up to the start of scan looking for APP1/Exif.
fn exif_segment(jpeg: &[u8]) -> Option<&[u8]> {
    if !jpeg.starts_with(&SOI) {
        return None;
    }
    let mut idx = 2;
    while idx + 4 <= jpeg.len() {
        if jpeg[idx] != 0xFF {
            idx += 1;
            continue;
        }
        let marker = jpeg[idx + 1];
        if marker == 0xD9 || marker == 0xDA {
            return None;
        }
        let len = u16::from_be_bytes([jpeg[idx + 2], jpeg[idx + 3]]) as usize;
        let body = idx + 4;
        if len < 2 || body + len - 2 > jpeg.len() {
            return None;
        }
        let payload = &jpeg[body..body + len - 2];
        if marker == 0xE1 && payload.starts_with(EXIF_HEADER) {
            return Some(&payload[EXIF_HEADER.len()..]);
        }
        idx = body + len - 2;
    }
    None
}
