//! スキャンセッションの状態機械
//!
//! 画面遷移:
//! AwaitingPermission → Camera → Preview (→ Loading) → Result → Camera
//!
//! Loading は Preview のサブ状態として持つ（送信中チケットの有無）。
//! 失敗は握りつぶさず SessionNotice として画面側へ渡す。

use std::fmt;

use crate::error::{Error, Result};
use crate::filters::{FilterOption, SelectedFilters};
use crate::types::{FieldMapping, ImageLocation};
use crate::upload::UploadRequest;

static NO_FILTERS: SelectedFilters = SelectedFilters::new();

/// 送信1回分の識別子
///
/// 撮り直しで置き換えられた古い送信の結果を捨てるために使う
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadTicket(u64);

impl UploadTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// 表示中の画面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    AwaitingPermission,
    Camera,
    Preview,
    Loading,
    Result,
}

/// セッション状態
#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    AwaitingPermission,
    Camera,
    Preview {
        image: ImageLocation,
        filters: SelectedFilters,
        /// Some の間は送信中（Loading）
        upload: Option<UploadTicket>,
    },
    Result {
        image: ImageLocation,
        filters: SelectedFilters,
        fields: FieldMapping,
    },
}

impl ScanState {
    fn describe(&self) -> &'static str {
        match self {
            ScanState::AwaitingPermission => "awaiting camera permission",
            ScanState::Camera => "on the camera",
            ScanState::Preview { upload: Some(_), .. } => "uploading",
            ScanState::Preview { upload: None, .. } => "previewing a capture",
            ScanState::Result { .. } => "showing results",
        }
    }
}

/// 画面に出すべき失敗（いずれも再試行可能）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    PermissionDenied,
    CaptureFailed(String),
    UploadFailed(String),
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionNotice::PermissionDenied => {
                write!(f, "We need your permission to use the camera")
            }
            SessionNotice::CaptureFailed(reason) => {
                write!(f, "Capture failed: {}. Try again.", reason)
            }
            SessionNotice::UploadFailed(reason) => {
                write!(f, "Upload failed: {}. Confirm again to retry.", reason)
            }
        }
    }
}

/// 送信完了を反映したかどうか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// 撮り直し等で無効になった送信の結果
    Stale,
}

/// 1画面分のスキャンセッション
#[derive(Debug, Clone)]
pub struct ScanSession {
    state: ScanState,
    notice: Option<SessionNotice>,
    next_ticket: u64,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    pub fn new() -> Self {
        Self {
            state: ScanState::AwaitingPermission,
            notice: None,
            next_ticket: 1,
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn view(&self) -> View {
        match &self.state {
            ScanState::AwaitingPermission => View::AwaitingPermission,
            ScanState::Camera => View::Camera,
            ScanState::Preview { upload: Some(_), .. } => View::Loading,
            ScanState::Preview { upload: None, .. } => View::Preview,
            ScanState::Result { .. } => View::Result,
        }
    }

    pub fn notice(&self) -> Option<&SessionNotice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn image_location(&self) -> Option<&ImageLocation> {
        match &self.state {
            ScanState::Preview { image, .. } | ScanState::Result { image, .. } => Some(image),
            _ => None,
        }
    }

    pub fn selected_filters(&self) -> &SelectedFilters {
        match &self.state {
            ScanState::Preview { filters, .. } | ScanState::Result { filters, .. } => filters,
            _ => &NO_FILTERS,
        }
    }

    /// 結果が届くまでは None
    pub fn result_fields(&self) -> Option<&FieldMapping> {
        match &self.state {
            ScanState::Result { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ScanState::Preview { upload: Some(_), .. })
    }

    // =============================================
    // 権限
    // =============================================

    pub fn permission_granted(&mut self) -> Result<()> {
        self.ensure(matches!(self.state, ScanState::AwaitingPermission), "grant permission")?;
        self.state = ScanState::Camera;
        self.notice = None;
        Ok(())
    }

    /// 拒否されても AwaitingPermission のまま（再要求に回数制限なし）
    pub fn permission_denied(&mut self) -> Result<()> {
        self.ensure(matches!(self.state, ScanState::AwaitingPermission), "deny permission")?;
        self.notice = Some(SessionNotice::PermissionDenied);
        Ok(())
    }

    // =============================================
    // 撮影
    // =============================================

    pub fn capture_succeeded(&mut self, image: ImageLocation) -> Result<()> {
        self.ensure(matches!(self.state, ScanState::Camera), "accept a capture")?;
        self.state = ScanState::Preview {
            image,
            filters: SelectedFilters::new(),
            upload: None,
        };
        self.notice = None;
        Ok(())
    }

    /// 撮影失敗: Camera に留まり通知を出す
    pub fn capture_failed(&mut self, reason: impl Into<String>) -> Result<()> {
        self.ensure(matches!(self.state, ScanState::Camera), "report a capture failure")?;
        self.notice = Some(SessionNotice::CaptureFailed(reason.into()));
        Ok(())
    }

    // =============================================
    // プレビュー
    // =============================================

    /// フィルタのトグル。送信中は受け付けない
    pub fn toggle_filter(&mut self, option: FilterOption) -> Result<bool> {
        let describe = self.state.describe();
        match &mut self.state {
            ScanState::Preview { filters, upload: None, .. } => Ok(filters.toggle(option)),
            _ => Err(Error::InvalidTransition {
                action: "toggle a filter",
                state: describe,
            }),
        }
    }

    /// 撮り直し: 画像・結果・フィルタを破棄して Camera へ
    ///
    /// 送信中でも可能。その送信の結果は Stale 扱いになる
    pub fn retake(&mut self) -> Result<()> {
        self.ensure(matches!(self.state, ScanState::Preview { .. }), "retake")?;
        self.state = ScanState::Camera;
        self.notice = None;
        Ok(())
    }

    /// 送信開始: 通信前に Loading に入る
    pub fn begin_upload(&mut self) -> Result<(UploadTicket, UploadRequest)> {
        let describe = self.state.describe();
        let ticket = UploadTicket(self.next_ticket);
        match &mut self.state {
            ScanState::Preview { image, filters, upload } if upload.is_none() => {
                *upload = Some(ticket);
                self.next_ticket += 1;
                self.notice = None;
                Ok((ticket, UploadRequest::new(image.clone(), filters.clone())))
            }
            _ => Err(Error::InvalidTransition {
                action: "start an upload",
                state: describe,
            }),
        }
    }

    pub fn upload_succeeded(&mut self, ticket: UploadTicket, fields: FieldMapping) -> Completion {
        if !self.is_current(ticket) {
            return Completion::Stale;
        }
        if let ScanState::Preview { image, filters, .. } =
            std::mem::replace(&mut self.state, ScanState::Camera)
        {
            self.state = ScanState::Result { image, filters, fields };
        }
        Completion::Applied
    }

    /// 送信失敗: Preview に戻り、結果は空のまま
    pub fn upload_failed(&mut self, ticket: UploadTicket, reason: impl Into<String>) -> Completion {
        if !self.is_current(ticket) {
            return Completion::Stale;
        }
        if let ScanState::Preview { upload, .. } = &mut self.state {
            *upload = None;
        }
        self.notice = Some(SessionNotice::UploadFailed(reason.into()));
        Completion::Applied
    }

    // =============================================
    // 結果
    // =============================================

    /// 新しくスキャン: 全て破棄して Camera へ
    pub fn scan_new(&mut self) -> Result<()> {
        self.ensure(matches!(self.state, ScanState::Result { .. }), "scan a new document")?;
        self.state = ScanState::Camera;
        self.notice = None;
        Ok(())
    }

    fn is_current(&self, ticket: UploadTicket) -> bool {
        matches!(self.state, ScanState::Preview { upload: Some(current), .. } if current == ticket)
    }

    fn ensure(&self, allowed: bool, action: &'static str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action,
                state: self.state.describe(),
            })
        }
    }
}
