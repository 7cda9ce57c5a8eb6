//! 検出オーケストレーション
//!
//! リクエストをカテゴリ列に展開し、カテゴリごとに検出クライアントを呼び出して
//! 1つの集約結果にまとめる。個々のカテゴリの失敗は結果に吸収され、
//! オーケストレータ自体が失敗するのは入力不備のときだけ。

use crate::config::{Config, DispatchMode};
use crate::detector::DetectorClient;
use crate::error::Result;
use futures::future::join_all;
use lesion_vision_common::{
    CategorySelection, DetectionAggregate, DetectionOutcome, DetectionRequest, LesionCategory,
};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Orchestrator {
    client: DetectorClient,
    dispatch: DispatchMode,
}

impl Orchestrator {
    pub fn new(client: DetectorClient, dispatch: DispatchMode) -> Self {
        Self { client, dispatch }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(DetectorClient::from_config(config)?, config.dispatch))
    }

    pub fn client(&self) -> &DetectorClient {
        &self.client
    }

    /// 生の入力（画像参照 + 選択）を検証して実行
    pub async fn detect(
        &self,
        image_reference: &str,
        selection: &CategorySelection,
    ) -> Result<DetectionAggregate> {
        let request = DetectionRequest::new(image_reference, selection)?;
        Ok(self.run(&request).await)
    }

    /// 検証済みリクエストを実行。全カテゴリ分の結果が揃ってから返す。
    pub async fn run(&self, request: &DetectionRequest) -> DetectionAggregate {
        let started = Instant::now();
        let image = request.image_reference();
        let categories = request.categories();

        let outcomes: Vec<(LesionCategory, DetectionOutcome)> = match self.dispatch {
            DispatchMode::Concurrent => {
                join_all(categories.iter().map(|&category| async move {
                    (category, self.client.invoke(category, image).await)
                }))
                .await
            }
            DispatchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(categories.len());
                for &category in categories {
                    outcomes.push((category, self.client.invoke(category, image).await));
                }
                outcomes
            }
        };

        let aggregate: DetectionAggregate = outcomes.into_iter().collect();

        let succeeded = aggregate.values().filter(|o| o.succeeded).count();
        info!(
            requested = categories.len(),
            succeeded,
            failed = aggregate.len() - succeeded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "detection run finished"
        );

        aggregate
    }
}
