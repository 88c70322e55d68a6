use super::{is_image_path, CaptureSurface, Permission};
use crate::error::{Result, VinScanError};
use dialoguer::Confirm;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use vin_scan_common::ImageLocation;
use walkdir::WalkDir;

type PermissionPrompt = Box<dyn FnMut(&Path) -> Result<bool> + Send>;

/// 撮影フォルダの最新画像を「撮影」結果とするカメラ
///
/// スマートフォンのカメラロール同期先などを指定して使う
pub struct FolderCamera {
    dir: PathBuf,
    permission: Permission,
    prompt: PermissionPrompt,
}

impl FolderCamera {
    /// `granted` は設定ファイルに保存された許可状態
    pub fn new(dir: PathBuf, granted: bool) -> Self {
        Self {
            dir,
            permission: if granted { Permission::Granted } else { Permission::Undetermined },
            prompt: Box::new(confirm_on_console),
        }
    }

    /// 権限確認の方法を差し替える
    pub fn with_prompt(mut self, prompt: impl FnMut(&Path) -> Result<bool> + Send + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn latest_image(&self) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(VinScanError::Capture(format!(
                "撮影フォルダが見つかりません: {}",
                self.dir.display()
            )));
        }

        let latest = WalkDir::new(&self.dir)
            .max_depth(1) // 直下のみ
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_image_path(e.path()))
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, e.into_path()))
            })
            // 同時刻ならファイル名の大きい方（連番の新しい方）
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, path)| path);

        Ok(latest)
    }
}

impl CaptureSurface for FolderCamera {
    fn permission(&self) -> Permission {
        self.permission
    }

    fn request_permission(&mut self) -> Result<Permission> {
        let allowed = (self.prompt)(&self.dir)?;
        self.permission = if allowed { Permission::Granted } else { Permission::Denied };
        Ok(self.permission)
    }

    fn capture(&mut self) -> Result<Option<ImageLocation>> {
        if self.permission != Permission::Granted {
            return Err(VinScanError::Capture("カメラへのアクセスが許可されていません".into()));
        }

        let latest = self.latest_image()?;
        debug!(dir = %self.dir.display(), captured = ?latest, "folder capture");
        Ok(latest.map(|path| ImageLocation::from_path(&path)))
    }
}

fn confirm_on_console(dir: &Path) -> Result<bool> {
    let allowed = Confirm::new()
        .with_prompt(format!("撮影フォルダ {} へのアクセスを許可しますか?", dir.display()))
        .default(true)
        .interact()?;
    Ok(allowed)
}
