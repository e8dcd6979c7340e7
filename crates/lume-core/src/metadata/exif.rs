use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDateTime;
use encoding_rs::WINDOWS_1252;
use exif::{Exif, In, Reader, Tag, Value};

/// Capture facts read from embedded EXIF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureInfo {
    pub taken_at: Option<NaiveDateTime>,
    pub device: Option<String>,
}

/// Read capture date and camera model from an image file.
/// Returns None when the file has no readable EXIF block.
pub fn read_capture_info(path: &Path) -> Option<CaptureInfo> {
    let file = File::open(path).ok()?;
    let exif = Reader::new()
        .read_from_container(&mut BufReader::new(file))
        .ok()?;
    Some(capture_info(&exif))
}

fn capture_info(exif: &Exif) -> CaptureInfo {
    // EXIF datetimes carry no timezone; they are local time as-is.
    let taken_at = [Tag::DateTimeOriginal, Tag::DateTimeDigitized]
        .iter()
        .find_map(|tag| ascii_field(exif, *tag).and_then(|s| parse_exif_datetime(&s)));

    let device = ascii_field(exif, Tag::Model).filter(|m| !m.is_empty());

    CaptureInfo { taken_at, device }
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(values) => values.first().map(|raw| decode_ascii(raw)),
        _ => None,
    }
}

/// Cameras are supposed to write ASCII, but plenty write Latin-1.
fn decode_ascii(raw: &[u8]) -> String {
    let text = match std::str::from_utf8(raw) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => WINDOWS_1252.decode(raw).0,
    };
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

/// Parse the fixed EXIF pattern `YYYY:MM:DD HH:MM:SS`.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y:%m:%d %H:%M:%S").ok()
}
