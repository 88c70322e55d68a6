//! アップロード内容の組み立て
//!
//! multipart本文は2パート:
//! - `image`: 画像バイナリ（ファイル名・Content-Type付き）
//! - `filters`: 選択フィルタのJSON配列
//!
//! HTTP送信そのものはCLI側のクライアントが行う

use crate::error::Result;
use crate::filters::SelectedFilters;
use crate::types::ImageLocation;

/// 画像パートの名前
pub const IMAGE_PART: &str = "image";
/// フィルタパートの名前
pub const FILTERS_PART: &str = "filters";

/// 1回分のアップロード内容
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    image: ImageLocation,
    filters: SelectedFilters,
}

impl UploadRequest {
    pub fn new(image: ImageLocation, filters: SelectedFilters) -> Self {
        Self { image, filters }
    }

    pub fn image(&self) -> &ImageLocation {
        &self.image
    }

    pub fn filters(&self) -> &SelectedFilters {
        &self.filters
    }

    /// 画像パートのファイル名
    pub fn file_name(&self) -> &str {
        self.image.file_name()
    }

    /// 画像パートのContent-Type
    pub fn content_type(&self) -> String {
        self.image.content_type()
    }

    /// フィルタパートの本文
    pub fn filters_json(&self) -> Result<String> {
        self.filters.to_json()
    }
}
