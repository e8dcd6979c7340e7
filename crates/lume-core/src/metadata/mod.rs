pub mod exif;
pub mod source;

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::trace;

use crate::error::{LumeError, Result};
use crate::media::{media_kind, DateOrigin, FileRecord, MediaKind};

/// Build the placement record for one candidate file.
///
/// Images take their date from EXIF when it parses, videos from the OS
/// creation time when the platform reports one; everything else falls back
/// to the modification time. Missing or broken metadata is never an error.
pub fn extract(path: &Path) -> Result<FileRecord> {
    let kind = media_kind(path).ok_or_else(|| LumeError::UnsupportedFormat {
        path: path.to_path_buf(),
    })?;

    let meta = fs::metadata(path).map_err(|e| LumeError::io("stat", path, e))?;
    let modified = meta
        .modified()
        .map(to_local_naive)
        .map_err(|e| LumeError::io("read modification time", path, e))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut captured_at = modified;
    let mut origin = DateOrigin::Modified;
    let mut device = None;

    match kind {
        MediaKind::Image => match exif::read_capture_info(path) {
            Some(info) => {
                if let Some(taken) = info.taken_at {
                    captured_at = taken;
                    origin = DateOrigin::Exif;
                }
                device = info.device;
            }
            None => trace!("No EXIF in {}", path.display()),
        },
        MediaKind::Video => {
            if let Ok(created) = meta.created() {
                captured_at = to_local_naive(created);
                origin = DateOrigin::Created;
            }
        }
    }

    let source = source::detect_source(&filename);

    Ok(FileRecord::new(
        path.to_path_buf(),
        filename,
        meta.len(),
        kind,
        modified,
        captured_at,
        origin,
        device,
        source,
    ))
}

fn to_local_naive(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();
        assert!(matches!(
            extract(&path),
            Err(LumeError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.jpg");
        assert!(matches!(extract(&path), Err(LumeError::Io { .. })));
    }

    #[test]
    fn test_image_without_exif_uses_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holiday.JPG");
        fs::File::create(&path)
            .unwrap()
            .write_all(b"no exif here")
            .unwrap();

        let ts = 1_500_000_000; // 2017-07-14 UTC
        filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(ts, 0)).unwrap();
        let expected = Local.timestamp_opt(ts, 0).unwrap().naive_local();

        let rec = extract(&path).unwrap();
        assert_eq!(rec.captured_at(), expected);
        assert_eq!(rec.date_origin(), DateOrigin::Modified);
        assert_eq!(rec.year(), expected.format("%Y").to_string());
        assert_eq!(rec.month(), expected.format("%m").to_string());
        assert_eq!(rec.device(), "Unknown");
        assert_eq!(rec.source(), "Other_Imports");
        assert_eq!(rec.size(), 12);
        assert_eq!(rec.filename(), "holiday.JPG");
    }

    #[test]
    fn test_video_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("VID_0001.mp4");
        fs::write(&path, b"moov").unwrap();

        let rec = extract(&path).unwrap();
        assert_eq!(rec.kind(), MediaKind::Video);
        assert_eq!(rec.source(), "Camera");
        assert!(matches!(
            rec.date_origin(),
            DateOrigin::Created | DateOrigin::Modified
        ));
        assert_eq!(rec.year().len(), 4);
        assert_eq!(rec.month().len(), 2);
    }
}
