//! 画像アップロード（外部オブジェクトストア）
//!
//! 未署名プリセットでのアップロード。成功すると公開URLを返す。
//! 失敗した場合、そのスキャンでは検出に進めない。

use crate::config::UploadConfig;
use crate::error::{LesionVisionError, Result};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const DEFAULT_ENDPOINT: &str = "https://api.cloudinary.com";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Uploader {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: String,
    folder: Option<String>,
}

impl Uploader {
    pub fn new(config: &UploadConfig, timeout: Duration) -> Result<Self> {
        let cloud_name = config
            .cloud_name
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| LesionVisionError::Config("upload.cloud_name is not set".into()))?;
        let upload_preset = config
            .upload_preset
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| LesionVisionError::Config("upload.upload_preset is not set".into()))?;

        let endpoint = config
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT)
            .trim_end_matches('/');

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            upload_url: format!("{}/v1_1/{}/image/upload", endpoint, cloud_name),
            upload_preset,
            folder: config.folder.clone(),
        })
    }

    /// 画像バイト列をアップロードして公開URLを取得
    pub async fn upload_bytes(&self, bytes: Vec<u8>, file_name: &str) -> Result<String> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let mut form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LesionVisionError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LesionVisionError::Upload(format!("HTTP {}: {}", status, body)));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| LesionVisionError::Upload(e.to_string()))?;

        let url = body
            .secure_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| LesionVisionError::Upload("response has no secure_url".into()))?;

        info!(file_name, url = %url, "image uploaded");
        Ok(url)
    }

    /// ローカルファイルをアップロード
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(LesionVisionError::InvalidRequest(format!(
                "image file not found: {}",
                path.display()
            )));
        }
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "lesion.jpg".to_string());
        self.upload_bytes(bytes, &file_name).await
    }
}
