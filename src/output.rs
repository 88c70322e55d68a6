//! 認識結果のコンソール表示

use vin_scan_common::ResultRow;

/// ラベル幅をそろえた表示用テキスト
pub fn format_rows(rows: &[ResultRow]) -> String {
    if rows.is_empty() {
        return "  (項目なし)".to_string();
    }

    let width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
    rows.iter()
        .map(|r| format!("  {:<width$}  {}", r.label, r.value, width = width))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_rows(rows: &[ResultRow]) {
    println!("{}", format_rows(rows));
}
