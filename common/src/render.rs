//! 認識結果の表示用整形

use serde::Serialize;
use serde_json::Value;

use crate::types::FieldMapping;

/// 値が空のときの表示
pub const NOT_AVAILABLE: &str = "N/A";

/// 表示用の1行（ラベル, 値）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub label: String,
    pub value: String,
}

impl ResultRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// マップの順序のまま行に変換
///
/// 並べ替え・除外・重複除去はしない
pub fn render_rows(fields: &FieldMapping) -> Vec<ResultRow> {
    fields
        .iter()
        .map(|(label, value)| ResultRow::new(label.clone(), display_value(value)))
        .collect()
}

/// 1つの値を表示文字列に変換
///
/// null・空文字・空白のみは "N/A"。文字列以外はJSON表記のまま
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::String(s) if s.trim().is_empty() => NOT_AVAILABLE.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(json: &str) -> FieldMapping {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_render_blank_as_not_available() {
        let rows = render_rows(&mapping(r#"{"Oil Type": "5W-30", "Oil Filter": ""}"#));
        assert_eq!(
            rows,
            vec![
                ResultRow::new("Oil Type", "5W-30"),
                ResultRow::new("Oil Filter", "N/A"),
            ]
        );
    }

    #[test]
    fn test_render_whitespace_only_as_not_available() {
        let rows = render_rows(&mapping(r#"{"Oil Type": "   "}"#));
        assert_eq!(rows, vec![ResultRow::new("Oil Type", "N/A")]);
    }

    #[test]
    fn test_render_null_as_not_available() {
        let rows = render_rows(&mapping(r#"{"Oil Capacity": null}"#));
        assert_eq!(rows[0].value, NOT_AVAILABLE);
    }

    #[test]
    fn test_render_keeps_response_order() {
        let rows = render_rows(&mapping(r#"{"b": "2", "a": "1", "c": "3"}"#));
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_render_keeps_value_text_verbatim() {
        let rows = render_rows(&mapping(r#"{"Oil Capacity": " 4.4 qt"}"#));
        assert_eq!(rows[0].value, " 4.4 qt");
    }

    #[test]
    fn test_render_non_string_values() {
        let rows = render_rows(&mapping(r#"{"Quarts": 5, "Synthetic": true}"#));
        assert_eq!(rows[0].value, "5");
        assert_eq!(rows[1].value, "true");
    }

    #[test]
    fn test_render_empty_mapping() {
        assert!(render_rows(&FieldMapping::new()).is_empty());
    }
}
