use serde::Serialize;
use vin_scan_common::{render_rows, FieldMapping, ResultRow, ScanSession, UploadTicket};

/// 保存用の認識結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedScan {
    pub image: String,
    pub filters: Vec<String>,
    pub fields: Vec<ResultRow>,
}

impl SavedScan {
    /// 結果表示中のセッションから作る
    pub fn from_session(session: &ScanSession) -> Option<Self> {
        let fields = session.result_fields()?;
        let image = session.image_location()?;
        Some(Self {
            image: image.to_string(),
            filters: session
                .selected_filters()
                .labels()
                .into_iter()
                .map(String::from)
                .collect(),
            fields: render_rows(fields),
        })
    }
}

pub enum UiMessage {
    UploadDone {
        ticket: UploadTicket,
        result: Result<FieldMapping, String>,
    },
}

pub struct ThumbData {
    pub location: String,
    pub size: [usize; 2],
    pub pixels: Vec<u8>,
}
