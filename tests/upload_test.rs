//! 認識サーバー送信テスト
//!
//! ローカルに立てた axum サーバーで multipart の中身とレスポンス処理を検証

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use vin_scan::camera::FileCamera;
use vin_scan::client::RecognitionClient;
use vin_scan::error::VinScanError;
use vin_scan::scan::{run_headless_scan, upload};
use vin_scan_common::{
    render_rows, Completion, FilterOption, ImageLocation, ResponseContract, ResultRow, ScanSession,
    SelectedFilters, UploadRequest, View,
};

#[derive(Debug, Clone)]
struct ReceivedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

type Received = Arc<Mutex<Vec<ReceivedPart>>>;

async fn collect_parts(received: &Received, mut multipart: Multipart) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.unwrap().to_vec();
        received.lock().unwrap().push(ReceivedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
}

async fn read_info(State(received): State<Received>, multipart: Multipart) -> Json<Value> {
    collect_parts(&received, multipart).await;
    Json(json!({ "Oil Type": "5W-30", "Oil Filter": "", "Oil Capacity": "   " }))
}

async fn read_vin(State(received): State<Received>, multipart: Multipart) -> Json<Value> {
    collect_parts(&received, multipart).await;
    Json(json!({ "VINTEXT": [0.97, "1HGCM82633A004352"] }))
}

async fn broken() -> &'static str {
    "<html>not json</html>"
}

async fn failing() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "model crashed")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

/// サーバーを起動してベースURLを返す
async fn spawn_server() -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route("/ReadInfo", post(read_info))
        .route("/ReadVIN", post(read_vin))
        .route("/broken", post(broken))
        .route("/failing", post(failing))
        .route("/slow", post(slow))
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), received)
}

fn client(base: &str, path: &str, contract: ResponseContract) -> RecognitionClient {
    RecognitionClient::with_endpoint(format!("{}{}", base, path), contract, Duration::from_secs(2))
        .expect("client build failed")
}

fn write_image(dir: &std::path::Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"\xFF\xD8\xFF\xE0fake-jpeg-bytes").unwrap();
    path
}

/// multipart の2パート（image / filters）の内容
#[tokio::test]
async fn test_upload_sends_image_and_filters_parts() {
    let (base, received) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "IMG_2041.JPG");

    let filters: SelectedFilters = [FilterOption::OilTypes, FilterOption::OilCapacity]
        .into_iter()
        .collect();
    let request = UploadRequest::new(ImageLocation::from_path(&path), filters.clone());

    let fields = client(&base, "/ReadInfo", ResponseContract::Fields)
        .upload(&request)
        .await
        .expect("upload failed");
    assert_eq!(fields.len(), 3);

    let parts = received.lock().unwrap().clone();
    assert_eq!(parts.len(), 2);

    let image = parts.iter().find(|p| p.name == "image").expect("image part missing");
    assert_eq!(image.file_name.as_deref(), Some("IMG_2041.JPG"));
    assert_eq!(image.content_type.as_deref(), Some("image/jpg"));
    assert_eq!(image.data, b"\xFF\xD8\xFF\xE0fake-jpeg-bytes");

    let filters_part = parts.iter().find(|p| p.name == "filters").expect("filters part missing");
    let sent: SelectedFilters = serde_json::from_slice(&filters_part.data).unwrap();
    assert_eq!(sent, filters);
}

/// フィルタ未選択でも filters パートは空配列で送る
#[tokio::test]
async fn test_upload_without_filters_sends_empty_array() {
    let (base, received) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "vin.png");

    let request = UploadRequest::new(ImageLocation::from_path(&path), SelectedFilters::new());
    client(&base, "/ReadInfo", ResponseContract::Fields)
        .upload(&request)
        .await
        .unwrap();

    let parts = received.lock().unwrap().clone();
    let filters_part = parts.iter().find(|p| p.name == "filters").unwrap();
    assert_eq!(filters_part.data, b"[]");
    let image = parts.iter().find(|p| p.name == "image").unwrap();
    assert_eq!(image.content_type.as_deref(), Some("image/png"));
}

/// レスポンス順・空値の "N/A" 表示
#[tokio::test]
async fn test_upload_result_renders_in_response_order() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "sticker.jpg");

    let request = UploadRequest::new(ImageLocation::from_path(&path), SelectedFilters::new());
    let fields = client(&base, "/ReadInfo", ResponseContract::Fields)
        .upload(&request)
        .await
        .unwrap();

    assert_eq!(
        render_rows(&fields),
        vec![
            ResultRow::new("Oil Type", "5W-30"),
            ResultRow::new("Oil Filter", "N/A"),
            ResultRow::new("Oil Capacity", "N/A"),
        ]
    );
}

/// 旧形式 (/ReadVIN) のレスポンス
#[tokio::test]
async fn test_upload_legacy_vin_contract() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "plate.jpeg");

    let request = UploadRequest::new(ImageLocation::from_path(&path), SelectedFilters::new());
    let fields = client(&base, ResponseContract::LegacyVin.path(), ResponseContract::LegacyVin)
        .upload(&request)
        .await
        .unwrap();

    assert_eq!(render_rows(&fields), vec![ResultRow::new("VIN", "1HGCM82633A004352")]);
}

/// JSONでないレスポンス
#[tokio::test]
async fn test_upload_undecodable_body() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "a.jpg");

    let request = UploadRequest::new(ImageLocation::from_path(&path), SelectedFilters::new());
    let err = client(&base, "/broken", ResponseContract::Fields)
        .upload(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, VinScanError::ApiParse(_)));
}

/// 5xx はステータスと本文を含むエラー
#[tokio::test]
async fn test_upload_server_error() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "a.jpg");

    let request = UploadRequest::new(ImageLocation::from_path(&path), SelectedFilters::new());
    let err = client(&base, "/failing", ResponseContract::Fields)
        .upload(&request)
        .await
        .unwrap_err();
    match err {
        VinScanError::ApiCall(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("model crashed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

/// タイムアウト
#[tokio::test]
async fn test_upload_times_out() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "a.jpg");

    let request = UploadRequest::new(ImageLocation::from_path(&path), SelectedFilters::new());
    let slow_client = RecognitionClient::with_endpoint(
        format!("{}/slow", base),
        ResponseContract::Fields,
        Duration::from_millis(200),
    )
    .unwrap();
    let err = slow_client.upload(&request).await.unwrap_err();
    assert!(matches!(err, VinScanError::Http(ref e) if e.is_timeout()));
}

/// 画像ファイルがない場合は送信しない
#[tokio::test]
async fn test_upload_missing_image() {
    let (base, received) = spawn_server().await;
    let request = UploadRequest::new(ImageLocation::new("/nonexistent/vin.jpg"), SelectedFilters::new());

    let err = client(&base, "/ReadInfo", ResponseContract::Fields)
        .upload(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, VinScanError::FileNotFound(_)));
    assert!(received.lock().unwrap().is_empty());
}

/// 接続できないサーバー
#[tokio::test]
async fn test_upload_connection_refused() {
    // 使われていないポートを確保してすぐ閉じる
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "a.jpg");
    let request = UploadRequest::new(ImageLocation::from_path(&path), SelectedFilters::new());

    let err = client(&format!("http://{}", addr), "/ReadInfo", ResponseContract::Fields)
        .upload(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, VinScanError::Http(_)));
}

/// 非対話モード: 撮影 → フィルタ → 送信 → 結果
#[tokio::test]
async fn test_headless_scan_round_trip() {
    let (base, received) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "order.jpg");

    let mut camera = FileCamera::new(path);
    let filters = [FilterOption::EngineAirFilter, FilterOption::EngineAirFilter];
    let fields = run_headless_scan(&mut camera, &client(&base, "/ReadInfo", ResponseContract::Fields), &filters)
        .await
        .unwrap();
    assert_eq!(fields.len(), 3);

    // 重複指定は1つにまとまる
    let parts = received.lock().unwrap().clone();
    let filters_part = parts.iter().find(|p| p.name == "filters").unwrap();
    assert_eq!(filters_part.data, br#"["Engine Air Filter"]"#);
}

/// 非対話モード: 撮影できなければ送信しない
#[tokio::test]
async fn test_headless_scan_capture_failure() {
    let (base, received) = spawn_server().await;
    let mut camera = FileCamera::new("/nonexistent/order.jpg".into());

    let err = run_headless_scan(&mut camera, &client(&base, "/ReadInfo", ResponseContract::Fields), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, VinScanError::Capture(ref msg) if msg.contains("Capture failed")));
    assert!(received.lock().unwrap().is_empty());
}

fn previewing(path: &std::path::Path) -> ScanSession {
    let mut session = ScanSession::new();
    session.permission_granted().unwrap();
    session.capture_succeeded(ImageLocation::from_path(path)).unwrap();
    session
}

/// 送信中の中断（Ctrl+C）は撮り直しになり、結果は反映しない
#[tokio::test]
async fn test_cancelled_upload_returns_to_camera() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "plate.jpg");

    let mut session = previewing(&path);
    session.toggle_filter(FilterOption::OilTypes).unwrap();

    let completion = upload(&mut session, &client(&base, "/slow", ResponseContract::Fields), async {})
        .await
        .unwrap();

    assert_eq!(completion, Completion::Stale);
    assert_eq!(session.view(), View::Camera);
    assert!(session.result_fields().is_none());
    assert!(session.image_location().is_none());
    assert!(session.selected_filters().is_empty());
    assert!(session.notice().is_none());
}

/// 中断されなければ結果画面へ
#[tokio::test]
async fn test_upload_without_cancel_shows_result() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "plate.jpg");

    let mut session = previewing(&path);
    let completion = upload(
        &mut session,
        &client(&base, "/ReadInfo", ResponseContract::Fields),
        std::future::pending::<()>(),
    )
    .await
    .unwrap();

    assert_eq!(completion, Completion::Applied);
    assert_eq!(session.view(), View::Result);
    assert_eq!(session.result_fields().map(|f| f.len()), Some(3));
}

/// 送信失敗はプレビューに戻り、再送できる
#[tokio::test]
async fn test_failed_upload_stays_in_preview() {
    let (base, _) = spawn_server().await;
    let dir = tempdir().unwrap();
    let path = write_image(dir.path(), "plate.jpg");

    let mut session = previewing(&path);
    let completion = upload(
        &mut session,
        &client(&base, "/failing", ResponseContract::Fields),
        std::future::pending::<()>(),
    )
    .await
    .unwrap();

    assert_eq!(completion, Completion::Applied);
    assert_eq!(session.view(), View::Preview);
    assert!(!session.is_loading());
    assert!(session.result_fields().is_none());
    assert!(session.begin_upload().is_ok());
}
