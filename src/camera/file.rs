use super::{CaptureSurface, Permission};
use crate::error::Result;
use std::path::PathBuf;
use vin_scan_common::ImageLocation;

/// ユーザーが指定した画像を撮影結果として返す
///
/// ファイルを明示的に渡している時点で許可済みとみなす
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: PathBuf,
}

impl FileCamera {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl CaptureSurface for FileCamera {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&mut self) -> Result<Permission> {
        Ok(Permission::Granted)
    }

    fn capture(&mut self) -> Result<Option<ImageLocation>> {
        if self.path.is_file() {
            Ok(Some(ImageLocation::from_path(&self.path)))
        } else {
            Ok(None)
        }
    }
}
