use chrono::{DateTime, Local};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 撮影日時を取得
///
/// EXIF DateTimeOriginal → DateTime → ファイル更新日時 の順に探す
pub fn capture_time(path: &Path) -> Option<String> {
    exif_date(path).ok().or_else(|| modified_time(path))
}

fn exif_date(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let mut bufreader = BufReader::new(file);
    let exif_reader = exif::Reader::new();
    let exif = exif_reader.read_from_container(&mut bufreader)?;

    for tag in [exif::Tag::DateTimeOriginal, exif::Tag::DateTime] {
        if let Some(field) = exif.get_field(tag, exif::In::PRIMARY) {
            return Ok(field.display_value().to_string());
        }
    }

    Err("No date found in EXIF".into())
}

fn modified_time(path: &Path) -> Option<String> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let local: DateTime<Local> = modified.into();
    Some(local.format("%Y-%m-%d %H:%M:%S").to_string())
}
