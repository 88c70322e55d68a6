//! 認識サーバー連携モジュール
//!
//! UploadRequest を multipart/form-data にして1回だけPOSTし、
//! レスポンスを FieldMapping にパースする。認証・リトライはしない。

use crate::config::Config;
use crate::error::{Result, VinScanError};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, warn};
use vin_scan_common::{
    parse_response, FieldMapping, ResponseContract, UploadRequest, FILTERS_PART, IMAGE_PART,
};

pub struct RecognitionClient {
    http: reqwest::Client,
    endpoint: String,
    contract: ResponseContract,
}

impl RecognitionClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_endpoint(
            config.endpoint(),
            config.contract,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn with_endpoint(
        endpoint: impl Into<String>,
        contract: ResponseContract,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            contract,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// multipart本文を組み立てる（画像はここで読み込む）
    pub async fn build_form(request: &UploadRequest) -> Result<Form> {
        let path = request.image().to_path();
        if !path.is_file() {
            return Err(VinScanError::FileNotFound(path.display().to_string()));
        }

        let bytes = tokio::fs::read(&path).await?;
        let image = Part::bytes(bytes)
            .file_name(request.file_name().to_string())
            .mime_str(&request.content_type())?;

        Ok(Form::new()
            .part(IMAGE_PART, image)
            .text(FILTERS_PART, request.filters_json()?))
    }

    /// 画像とフィルタを送信して認識結果を受け取る
    pub async fn upload(&self, request: &UploadRequest) -> Result<FieldMapping> {
        let form = Self::build_form(request).await?;

        debug!(
            endpoint = %self.endpoint,
            file = request.file_name(),
            filters = ?request.filters().labels(),
            "uploading capture"
        );

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(%status, "recognition service returned an error");
            return Err(VinScanError::ApiCall(format!("{} {}", status, body.trim())));
        }

        let fields = parse_response(&body, self.contract).map_err(|e| {
            warn!(error = %e, "undecodable recognition response");
            VinScanError::ApiParse(e.to_string())
        })?;

        debug!(fields = fields.len(), "recognition response parsed");
        Ok(fields)
    }
}
