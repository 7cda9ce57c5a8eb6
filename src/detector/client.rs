use super::registry::DetectorRegistry;
use crate::config::Config;
use crate::error::{LesionVisionError, Result};
use lesion_vision_common::{DetectionOutcome, LesionCategory};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// 検出サービスへのリクエスト
#[derive(Debug, Serialize)]
struct DetectorRequest<'a> {
    image: &'a str,
}

/// 検出サービスのレスポンス
#[derive(Debug, Deserialize)]
struct DetectorResponse {
    status: bool,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    mask_url: Option<String>,
    #[serde(default)]
    labeled_url: Option<String>,
    #[serde(default)]
    heatmap_url: Option<String>,
}

impl DetectorResponse {
    fn into_outcome(self, category: LesionCategory) -> Result<DetectionOutcome> {
        if let Some(confidence) = self.confidence {
            if !confidence.is_finite() || !(0.0..=100.0).contains(&confidence) {
                return Err(LesionVisionError::DetectorResponse {
                    category: category.to_string(),
                    message: format!("confidence out of range: {}", confidence),
                });
            }
        }

        let non_empty = |url: Option<String>| url.filter(|u| !u.trim().is_empty());

        Ok(DetectionOutcome {
            succeeded: true,
            detected: self.status,
            confidence: self.confidence,
            mask_image: non_empty(self.mask_url),
            labeled_image: non_empty(self.labeled_url),
            heatmap_image: non_empty(self.heatmap_url),
        })
    }
}

/// 1カテゴリ分の検出クライアント
#[derive(Debug, Clone)]
pub struct DetectorClient {
    registry: DetectorRegistry,
    http: reqwest::Client,
}

impl DetectorClient {
    pub fn new(registry: DetectorRegistry, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { registry, http })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            DetectorRegistry::from_config(config),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    /// 検出を実行。失敗はすべて正規の失敗結果に変換し、エラーは返さない。
    pub async fn invoke(&self, category: LesionCategory, image_reference: &str) -> DetectionOutcome {
        match self.try_invoke(category, image_reference).await {
            Ok(outcome) => {
                debug!(
                    category = %category,
                    detected = outcome.detected,
                    confidence = ?outcome.confidence,
                    "detection completed"
                );
                outcome
            }
            Err(e) => {
                warn!(category = %category, error = %e, "detection failed");
                DetectionOutcome::failure()
            }
        }
    }

    async fn try_invoke(
        &self,
        category: LesionCategory,
        image_reference: &str,
    ) -> Result<DetectionOutcome> {
        let url = self
            .registry
            .resolve(category)
            .ok_or_else(|| LesionVisionError::DetectorCall {
                category: category.to_string(),
                message: format!("service address not configured ({})", category.env_var()),
            })?;

        let response = self
            .http
            .post(url)
            .json(&DetectorRequest {
                image: image_reference,
            })
            .send()
            .await
            .map_err(|e| LesionVisionError::DetectorCall {
                category: category.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LesionVisionError::DetectorCall {
                category: category.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let body: DetectorResponse =
            response
                .json()
                .await
                .map_err(|e| LesionVisionError::DetectorResponse {
                    category: category.to_string(),
                    message: e.to_string(),
                })?;

        body.into_outcome(category)
    }
}
