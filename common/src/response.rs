//! 認識サーバーのレスポンスパーサー
//!
//! サーバーは2種類のレスポンス形式を返してきた:
//! 1. フラットなマップ `{ "ラベル": "値", ... }` （/ReadInfo）
//! 2. 旧形式 `{ "VINTEXT": [_, "<テキスト>"] }` （/ReadVIN）
//!
//! どちらを使うかは設定で選び、結果は常に FieldMapping にそろえる

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::FieldMapping;

/// 旧形式のレスポンスを変換するときのラベル
pub const LEGACY_VIN_LABEL: &str = "VIN";

const LEGACY_VIN_KEY: &str = "VINTEXT";

/// レスポンス形式（＝エンドポイント）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseContract {
    /// `POST /ReadInfo` → フラットなマップ
    #[default]
    Fields,
    /// `POST /ReadVIN` → `VINTEXT[1]`
    LegacyVin,
}

impl ResponseContract {
    /// サーバーURLに付けるパス
    pub fn path(&self) -> &'static str {
        match self {
            ResponseContract::Fields => "/ReadInfo",
            ResponseContract::LegacyVin => "/ReadVIN",
        }
    }
}

impl fmt::Display for ResponseContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseContract::Fields => write!(f, "fields"),
            ResponseContract::LegacyVin => write!(f, "legacy-vin"),
        }
    }
}

impl FromStr for ResponseContract {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fields" | "info" => Ok(ResponseContract::Fields),
            "legacy-vin" | "legacy" | "vin" => Ok(ResponseContract::LegacyVin),
            _ => Err(format!("Unknown contract: {}. Use fields or legacy-vin", s)),
        }
    }
}

/// レスポンス本文を FieldMapping にパース
///
/// # Arguments
/// * `body` - レスポンス本文
/// * `contract` - 期待するレスポンス形式
///
/// # Returns
/// * `Ok(FieldMapping)` - パース成功
/// * `Err(Error::Parse)` - JSONでない、または形式が合わない
///
/// # Examples
/// ```
/// use vin_scan_common::{parse_response, ResponseContract};
///
/// let fields = parse_response(r#"{"Oil Type": "5W-30"}"#, ResponseContract::Fields).unwrap();
/// assert_eq!(fields.len(), 1);
/// ```
pub fn parse_response(body: &str, contract: ResponseContract) -> Result<FieldMapping> {
    let value: Value = serde_json::from_str(body.trim())
        .map_err(|e| Error::Parse(format!("レスポンスがJSONではありません: {}", e)))?;

    match contract {
        ResponseContract::Fields => match value {
            Value::Object(map) => Ok(FieldMapping::from(map)),
            other => Err(Error::Parse(format!(
                "JSONオブジェクトを期待しましたが {} でした",
                json_kind(&other)
            ))),
        },
        ResponseContract::LegacyVin => {
            let text = value
                .get(LEGACY_VIN_KEY)
                .and_then(Value::as_array)
                .and_then(|items| items.get(1))
                .ok_or_else(|| Error::Parse(format!("{}[1] が見つかりません", LEGACY_VIN_KEY)))?;

            let mut fields = FieldMapping::new();
            fields.insert(LEGACY_VIN_LABEL, text.clone());
            Ok(fields)
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
