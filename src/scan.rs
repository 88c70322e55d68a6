//! スキャンセッションの実行
//!
//! ScanSession（状態機械）を撮影面・認識クライアントとつないで動かす。
//! - run_interactive_scan: メニューで操作する対話モード
//! - run_headless_scan: 1回分を流すだけの非対話モード（`upload` サブコマンド）

use crate::camera::{capture_time, CaptureSurface, Permission};
use crate::client::RecognitionClient;
use crate::error::{Result, VinScanError};
use crate::output::print_rows;
use dialoguer::{MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use vin_scan_common::{
    render_rows, Completion, FieldMapping, FilterOption, ScanSession, SelectedFilters,
    SessionNotice, View,
};

/// 対話アクション
enum PreviewAction {
    Upload,
    SelectFilters,
    Retake,
    Quit,
}

/// 対話式でスキャンを繰り返す
///
/// `on_grant` は権限が新たに許可されたときに呼ばれる（設定への保存用）
pub async fn run_interactive_scan(
    camera: &mut dyn CaptureSurface,
    client: &RecognitionClient,
    preset: &[FilterOption],
    mut on_grant: impl FnMut() -> Result<()>,
) -> Result<()> {
    let mut session = ScanSession::new();

    // 起動時の許可済みチェック
    if camera.permission() == Permission::Granted {
        session.permission_granted()?;
    }

    loop {
        let notice = session.notice().cloned();
        if let Some(notice) = &notice {
            println!("⚠ {}", notice);
            session.dismiss_notice();
        }

        match session.view() {
            View::AwaitingPermission => {
                if notice == Some(SessionNotice::PermissionDenied)
                    && choose(&["もう一度許可を求める", "終了"])? != 0
                {
                    break;
                }
                request_access(&mut session, camera, &mut on_grant)?;
            }

            View::Camera => {
                if choose(&["📷 撮影", "終了"])? != 0 {
                    break;
                }
                capture(&mut session, camera)?;
                if session.view() == View::Preview {
                    apply_preset(&mut session, preset)?;
                    print_preview(&session);
                }
            }

            View::Preview | View::Loading => {
                print_filters(session.selected_filters());
                match preview_action()? {
                    PreviewAction::Upload => {
                        let completion = upload(&mut session, client, async {
                            let _ = tokio::signal::ctrl_c().await;
                        })
                        .await?;
                        if completion == Completion::Stale {
                            println!("⏹ 送信を中断しました");
                        }
                    }
                    PreviewAction::SelectFilters => select_filters(&mut session)?,
                    PreviewAction::Retake => {
                        session.retake()?;
                        println!("↩ 撮り直します\n");
                    }
                    PreviewAction::Quit => break,
                }
            }

            View::Result => {
                if let Some(fields) = session.result_fields() {
                    println!("\n✔ 認識結果:");
                    print_rows(&render_rows(fields));
                    println!();
                }
                if choose(&["🔄 新しくスキャン", "終了"])? != 0 {
                    break;
                }
                session.scan_new()?;
            }
        }
    }

    Ok(())
}

/// 権限確認 → 撮影 → フィルタ → 送信 を1回だけ行う
pub async fn run_headless_scan(
    camera: &mut dyn CaptureSurface,
    client: &RecognitionClient,
    filters: &[FilterOption],
) -> Result<FieldMapping> {
    let mut session = ScanSession::new();

    let permission = match camera.permission() {
        Permission::Granted => Permission::Granted,
        _ => camera.request_permission()?,
    };
    if permission != Permission::Granted {
        session.permission_denied()?;
        return Err(notice_error(&session));
    }
    session.permission_granted()?;

    capture(&mut session, camera)?;
    if session.view() != View::Preview {
        return Err(notice_error(&session));
    }
    apply_preset(&mut session, filters)?;

    let (ticket, request) = session.begin_upload()?;
    match client.upload(&request).await {
        Ok(fields) => {
            session.upload_succeeded(ticket, fields);
        }
        Err(e) => {
            warn!(error = %e, "upload failed");
            session.upload_failed(ticket, e.to_string());
            return Err(e);
        }
    }

    session
        .result_fields()
        .cloned()
        .ok_or_else(|| VinScanError::ApiCall("認識結果がありません".into()))
}

/// 権限を要求してセッションに反映する
///
/// 新たに許可されたときだけ `on_grant` を呼ぶ
pub fn request_access(
    session: &mut ScanSession,
    camera: &mut dyn CaptureSurface,
    mut on_grant: impl FnMut() -> Result<()>,
) -> Result<Permission> {
    let permission = camera.request_permission()?;
    match permission {
        Permission::Granted => {
            session.permission_granted()?;
            on_grant()?;
        }
        Permission::Denied | Permission::Undetermined => session.permission_denied()?,
    }
    Ok(permission)
}

fn capture(session: &mut ScanSession, camera: &mut dyn CaptureSurface) -> Result<()> {
    match camera.capture() {
        Ok(Some(image)) => session.capture_succeeded(image)?,
        Ok(None) => session.capture_failed("画像が得られませんでした")?,
        Err(e) => {
            warn!(error = %e, "capture failed");
            session.capture_failed(e.to_string())?;
        }
    }
    Ok(())
}

/// 引数で指定されたフィルタを選択状態にする（重複指定は1回として扱う）
pub fn apply_preset(session: &mut ScanSession, preset: &[FilterOption]) -> Result<()> {
    let wanted: SelectedFilters = preset.iter().copied().collect();
    for option in wanted.iter() {
        if !session.selected_filters().contains(option) {
            session.toggle_filter(option)?;
        }
    }
    Ok(())
}

/// 送信して結果をセッションに反映する
///
/// `cancel` が先に完了したら送信を中断して撮り直しに戻る（結果は Stale）
pub async fn upload(
    session: &mut ScanSession,
    client: &RecognitionClient,
    cancel: impl Future<Output = ()>,
) -> Result<Completion> {
    let (ticket, request) = session.begin_upload()?;
    debug!(ticket = ticket.id(), endpoint = client.endpoint(), "upload started");

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("認識中... (Ctrl+Cで中断して撮り直し)");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = tokio::select! {
        biased;
        _ = cancel => None,
        result = client.upload(&request) => Some(result),
    };
    spinner.finish_and_clear();

    let completion = match outcome {
        Some(Ok(fields)) => session.upload_succeeded(ticket, fields),
        Some(Err(e)) => {
            warn!(error = %e, "upload failed");
            session.upload_failed(ticket, e.to_string())
        }
        None => {
            session.retake()?;
            Completion::Stale
        }
    };
    debug!(ticket = ticket.id(), ?completion, "upload settled");
    Ok(completion)
}

fn select_filters(session: &mut ScanSession) -> Result<()> {
    let labels: Vec<&str> = FilterOption::ALL.iter().map(|f| f.label()).collect();
    let defaults: Vec<bool> = FilterOption::ALL
        .iter()
        .map(|f| session.selected_filters().contains(*f))
        .collect();

    let chosen = MultiSelect::new()
        .with_prompt("フィルタを選択 (Spaceで切替, Enterで確定)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    for (index, option) in FilterOption::ALL.iter().enumerate() {
        if chosen.contains(&index) != session.selected_filters().contains(*option) {
            session.toggle_filter(*option)?;
        }
    }
    Ok(())
}

fn print_preview(session: &ScanSession) {
    let Some(image) = session.image_location() else {
        return;
    };
    println!("\n🖼  {}", image.file_name());
    if let Some(time) = capture_time(&image.to_path()) {
        println!("   撮影日時: {}", time);
    }
}

fn print_filters(filters: &SelectedFilters) {
    if filters.is_empty() {
        println!("   フィルタ: なし（全項目）");
    } else {
        println!("   フィルタ: {}", filters.labels().join(", "));
    }
}

fn preview_action() -> Result<PreviewAction> {
    let action = match choose(&["📤 送信", "🏷  フィルタを選択", "↩ 撮り直す", "終了"])? {
        0 => PreviewAction::Upload,
        1 => PreviewAction::SelectFilters,
        2 => PreviewAction::Retake,
        _ => PreviewAction::Quit,
    };
    Ok(action)
}

fn choose(items: &[&str]) -> Result<usize> {
    Ok(Select::new().items(items).default(0).interact()?)
}

fn notice_error(session: &ScanSession) -> VinScanError {
    let message = session
        .notice()
        .map(|n| n.to_string())
        .unwrap_or_else(|| "撮影できませんでした".into());
    VinScanError::Capture(message)
}
