//! 画像のインライン化
//!
//! リモート画像を取得して Data URL に変換する。PDF出力時はネットワークに
//! アクセスできないため、描画前にレコード内の全画像をインライン化しておく。

use crate::error::{LesionVisionError, Result};
use lesion_vision_common::data_url::{is_data_url, to_data_url};
use lesion_vision_common::PatientRecord;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AssetInliner {
    http: reqwest::Client,
}

impl AssetInliner {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// 参照をインライン化
    ///
    /// - None / 空文字 → None（エラーではない）
    /// - 既に Data URL → そのまま返す
    /// - 取得失敗 → エラー（呼び出し側で中断するか代替画像を使う）
    pub async fn inline(&self, reference: Option<&str>) -> Result<Option<String>> {
        let reference = match reference.map(str::trim) {
            None | Some("") => return Ok(None),
            Some(r) => r,
        };

        if is_data_url(reference) {
            return Ok(Some(reference.to_string()));
        }

        let fetch_error = |message: String| {
            LesionVisionError::AssetFetch(format!("{}: {}", reference, message))
        };

        let response = self
            .http
            .get(reference)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let header_mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let mime = detect_mime_type(header_mime.as_deref(), &bytes);
        debug!(reference, mime = %mime, size = bytes.len(), "asset inlined");

        Ok(Some(to_data_url(&mime, &bytes)))
    }

    /// レポートに載る画像（元画像 + 掲載対象カテゴリのマスク/ラベル/ヒートマップ）をインライン化
    ///
    /// 掲載されない結果の参照はそのまま残す（取得もしない）。
    pub async fn inline_record(&self, record: &PatientRecord) -> Result<PatientRecord> {
        let mut inlined = record.clone();

        inlined.patient_lesion_image = self.inline(record.patient_lesion_image.as_deref()).await?;

        for outcome in inlined.lesions.values_mut().filter(|o| o.is_reportable()) {
            outcome.mask_image = self.inline(outcome.mask_image.as_deref()).await?;
            outcome.labeled_image = self.inline(outcome.labeled_image.as_deref()).await?;
            outcome.heatmap_image = self.inline(outcome.heatmap_image.as_deref()).await?;
        }

        Ok(inlined)
    }
}

/// Content-Type が画像ならそれを使い、なければ中身から判定
fn detect_mime_type(header: Option<&str>, bytes: &[u8]) -> String {
    if let Some(mime) = header.filter(|m| m.starts_with("image/")) {
        return mime.to_string();
    }

    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_detect_mime_prefers_image_header() {
        assert_eq!(detect_mime_type(Some("image/webp"), PNG_SIGNATURE), "image/webp");
    }

    #[test]
    fn test_detect_mime_sniffs_when_header_is_generic() {
        assert_eq!(
            detect_mime_type(Some("application/octet-stream"), PNG_SIGNATURE),
            "image/png"
        );
        assert_eq!(detect_mime_type(None, b"not an image"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_inline_none_and_empty() {
        let inliner = AssetInliner::new(Duration::from_secs(1)).unwrap();
        assert_eq!(inliner.inline(None).await.unwrap(), None);
        assert_eq!(inliner.inline(Some("  ")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_inline_passes_data_url_through() {
        let inliner = AssetInliner::new(Duration::from_secs(1)).unwrap();
        let data = "data:image/png;base64,iVBORw0KGgo=";
        assert_eq!(inliner.inline(Some(data)).await.unwrap().as_deref(), Some(data));
    }
}
