use anyhow::{anyhow, bail, Context, Result};
use image::ImageReader;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use serde_json::{Map, Value};
use vin_scan_common::{FieldMapping, UploadRequest};

use crate::model::{SavedScan, ThumbData};

const CAMERA_ACCESS_KEY: &str = "camera_access_granted";

/// CLIの `upload --json` で送信し、標準出力のJSONを読む
pub fn run_upload(request: &UploadRequest) -> Result<FieldMapping> {
    let cli = resolve_cli_binary();
    let mut command = Command::new(&cli);
    command.arg("upload").arg(request.image().to_path()).arg("--json");
    for filter in request.filters().iter() {
        command.arg("--filter").arg(filter.id());
    }

    let out = command
        .output()
        .with_context(|| format!("run {}", cli.display()))?;
    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        bail!("{}", stderr.trim());
    }

    let fields: FieldMapping =
        serde_json::from_slice(&out.stdout).context("parse upload output")?;
    Ok(fields)
}

pub fn save_scan(path: &Path, scan: &SavedScan) -> Result<()> {
    let content = serde_json::to_string_pretty(scan)?;
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn default_scan_path(image: &str) -> String {
    let stem = Path::new(image.strip_prefix("file://").unwrap_or(image))
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scan");
    format!("{stem}.scan.json")
}

/// CLIと共有する設定ファイル
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("vin-scan").join("config.json"))
}

/// 保存済みのカメラ許可。読めなければ未許可
pub fn camera_access_granted(path: &Path) -> bool {
    fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<Value>(&content).ok())
        .and_then(|value| value.get(CAMERA_ACCESS_KEY).and_then(Value::as_bool))
        .unwrap_or(false)
}

/// 許可を保存する。他の設定項目はそのまま残す
pub fn persist_camera_access(path: &Path) -> Result<()> {
    let mut value = match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str::<Value>(&content)
            .with_context(|| format!("parse {}", path.display()))?,
        Err(_) => Value::Object(Map::new()),
    };
    let object = value
        .as_object_mut()
        .ok_or_else(|| anyhow!("{} is not a JSON object", path.display()))?;
    object.insert(CAMERA_ACCESS_KEY.to_string(), Value::Bool(true));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn load_thumbnail(location: String, path: &Path) -> ThumbData {
    let image = ImageReader::open(path).ok().and_then(|r| r.decode().ok());
    match image {
        Some(image) => {
            let thumb = image.thumbnail(480, 360);
            ThumbData {
                location,
                size: [thumb.width() as usize, thumb.height() as usize],
                pixels: thumb.to_rgba8().into_raw(),
            }
        }
        None => ThumbData {
            location,
            size: [0, 0],
            pixels: Vec::new(),
        },
    }
}

fn resolve_cli_binary() -> PathBuf {
    let name = format!("vin-scan{}", std::env::consts::EXE_SUFFIX);
    let exe = std::env::current_exe().ok();
    if let Some(base_dir) = exe.as_ref().and_then(|p| p.parent()) {
        let local = base_dir.join(&name);
        if local.exists() {
            return local;
        }
        if let Some(target_dir) = base_dir.parent() {
            for profile in ["debug", "release"] {
                let sibling = target_dir.join(profile).join(&name);
                if sibling.exists() {
                    return sibling;
                }
            }
        }
    }
    PathBuf::from(name)
}
