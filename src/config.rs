use crate::error::{Result, VinScanError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;
use vin_scan_common::ResponseContract;

/// 環境変数でサーバーURLを上書きする
pub const SERVER_URL_ENV: &str = "VIN_SCAN_SERVER_URL";

const DEFAULT_SERVER_URL: &str = "http://192.168.1.119:5000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub contract: ResponseContract,
    pub timeout_seconds: u64,
    /// FolderCamera が監視するフォルダ（未設定なら ~/Pictures）
    pub capture_dir: Option<PathBuf>,
    /// 一度許可したら次回以降は確認しない
    pub camera_access_granted: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            contract: ResponseContract::default(),
            timeout_seconds: 30,
            capture_dir: None,
            camera_access_granted: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env()?;
        Ok(config)
    }

    /// 環境変数 `VIN_SCAN_SERVER_URL` があればサーバーURLを上書き
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                self.set_server_url(url.to_string())?;
            }
        }
        Ok(())
    }

    /// CLI引数での上書き
    pub fn apply_overrides(
        &mut self,
        server_url: Option<String>,
        contract: Option<ResponseContract>,
    ) -> Result<()> {
        if let Some(url) = server_url {
            self.set_server_url(url)?;
        }
        if let Some(contract) = contract {
            self.contract = contract;
        }
        Ok(())
    }

    /// `config` サブコマンド用: 壊れたファイルは既定値から作り直す
    pub fn load_for_edit(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable config, starting from defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 権限を許可済みとして保存する
    ///
    /// CLI引数・環境変数での上書きを保存しないよう、ファイルの内容だけを更新する
    pub fn persist_camera_access() -> Result<()> {
        let path = Self::config_path()?;
        let mut stored = Self::load_from(&path)?;
        if !stored.camera_access_granted {
            stored.camera_access_granted = true;
            stored.save_to(&path)?;
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| VinScanError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("vin-scan").join("config.json"))
    }

    /// アップロード先URL（サーバーURL + 形式ごとのパス）
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), self.contract.path())
    }

    /// 撮影フォルダ。未設定ならピクチャフォルダ
    pub fn resolve_capture_dir(&self) -> Result<PathBuf> {
        self.capture_dir
            .clone()
            .or_else(dirs::picture_dir)
            .ok_or_else(|| {
                VinScanError::Config(
                    "撮影フォルダが未設定です。`vin-scan config --set-capture-dir DIR` で設定してください".into(),
                )
            })
    }

    pub fn set_server_url(&mut self, url: String) -> Result<()> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(VinScanError::Config(format!(
                "サーバーURLは http:// か https:// で始めてください: {}",
                url
            )));
        }
        self.server_url = url;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint() {
        let config = Config::default();
        assert_eq!(config.endpoint(), "http://192.168.1.119:5000/ReadInfo");
    }

    #[test]
    fn test_legacy_endpoint_trims_slash() {
        let config = Config {
            server_url: "http://localhost:5000/".into(),
            contract: ResponseContract::LegacyVin,
            ..Default::default()
        };
        assert_eq!(config.endpoint(), "http://localhost:5000/ReadVIN");
    }

    #[test]
    fn test_set_server_url_validates_scheme() {
        let mut config = Config::default();
        assert!(config.set_server_url("ftp://host".into()).is_err());
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);

        config.set_server_url("https://scan.example.com".into()).unwrap();
        assert_eq!(config.server_url, "https://scan.example.com");
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(Some("http://localhost:5000".into()), Some(ResponseContract::LegacyVin))
            .unwrap();
        assert_eq!(config.endpoint(), "http://localhost:5000/ReadVIN");

        assert!(config.apply_overrides(Some("localhost".into()), None).is_err());
        assert_eq!(config.server_url, "http://localhost:5000");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"timeout_seconds": 5}"#).unwrap();
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert!(!config.camera_access_granted);
    }
}
