//! 撮影面（カメラ）の抽象化
//!
//! - FolderCamera: 撮影フォルダ（カメラロール同期先など）の最新画像を撮影結果とする
//! - FileCamera: 指定された画像ファイルをそのまま撮影結果とする

mod exif;
mod file;
mod folder;

pub use exif::capture_time;
pub use file::FileCamera;
pub use folder::FolderCamera;

use crate::error::Result;
use vin_scan_common::ImageLocation;

/// 撮影権限の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Undetermined,
}

pub trait CaptureSurface {
    /// 現在の権限（起動時の許可済みチェック）
    fn permission(&self) -> Permission;

    /// 権限を要求する
    fn request_permission(&mut self) -> Result<Permission>;

    /// 静止画を撮影する。画像が得られなければ None
    fn capture(&mut self) -> Result<Option<ImageLocation>>;
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "JPG", "JPEG", "PNG", "HEIC"];

fn is_image_path(path: &std::path::Path) -> bool {
    path.extension()
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|&e| e == ext.to_string_lossy()))
        .unwrap_or(false)
}
