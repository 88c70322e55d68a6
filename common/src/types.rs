//! セッションで扱う値の型定義
//!
//! - ImageLocation: 撮影画像の参照（パスまたは file:// URI）
//! - FieldMapping: 認識サーバーが返す ラベル → 値 のマップ

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// 撮影画像の場所
///
/// 中身は不透明な参照として扱い、ファイル名と拡張子だけを切り出す
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageLocation(String);

impl ImageLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// ローカルパスから作る（区切り文字は `/` にそろえる）
    pub fn from_path(path: &Path) -> Self {
        let text = path.to_string_lossy();
        if std::path::MAIN_SEPARATOR == '/' {
            Self(text.into_owned())
        } else {
            Self(text.replace(std::path::MAIN_SEPARATOR, "/"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 末尾のパスセグメント（`/` 区切り）
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// ファイル名の最後の `.` 以降
    pub fn extension(&self) -> Option<&str> {
        self.file_name()
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }

    /// `image/<拡張子>`（拡張子なしは application/octet-stream）
    pub fn content_type(&self) -> String {
        match self.extension() {
            Some(ext) => format!("image/{}", ext.to_ascii_lowercase()),
            None => "application/octet-stream".to_string(),
        }
    }

    /// ローカルファイルのパスに変換（file:// は剥がす）
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(self.0.strip_prefix("file://").unwrap_or(&self.0))
    }
}

impl fmt::Display for ImageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 認識結果のフィールドマップ
///
/// JSONオブジェクトのキー順を保持する
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(Map<String, Value>);

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(label.into(), value.into());
    }

    pub fn get(&self, label: &str) -> Option<&Value> {
        self.0.get(label)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for FieldMapping {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
