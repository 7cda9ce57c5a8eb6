//! 結合テスト用のローカルHTTPサーバー

#![allow(dead_code)]

use axum::{http::StatusCode, routing::post, Json, Router};
use lesion_vision::config::DispatchMode;
use lesion_vision::detector::{DetectorClient, DetectorRegistry};
use lesion_vision::orchestrator::Orchestrator;
use lesion_vision_common::data_url::to_data_url;
use lesion_vision_common::LesionCategory;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::time::Duration;

/// テスト用の検出タイムアウト
pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

/// ルーターを 127.0.0.1 の空きポートで起動し、ベースURLを返す
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn detected(Json(body): Json<Value>) -> Json<Value> {
    let image = body["image"].as_str().unwrap_or_default().to_string();
    Json(json!({
        "status": !image.is_empty(),
        "confidence": 12.5,
        "mask_url": format!("{}#mask", image),
        "labeled_url": format!("{}#labeled", image),
        "heatmap_url": "",
    }))
}

async fn not_detected() -> Json<Value> {
    Json(json!({ "status": false, "confidence": 0.0, "mask_url": "" }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(TEST_TIMEOUT * 4).await;
    Json(json!({ "status": true, "confidence": 50.0, "mask_url": "https://x/late.png" }))
}

async fn malformed() -> &'static str {
    "<html>not json</html>"
}

async fn server_error() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn out_of_range() -> Json<Value> {
    Json(json!({ "status": true, "confidence": 140.0, "mask_url": "https://x/m.png" }))
}

/// 挙動ごとにパスを分けた偽の検出サービス
pub async fn spawn_fake_detectors() -> String {
    let app = Router::new()
        .route("/detected", post(detected))
        .route("/not-detected", post(not_detected))
        .route("/slow", post(slow))
        .route("/malformed", post(malformed))
        .route("/error", post(server_error))
        .route("/out-of-range", post(out_of_range));
    spawn(app).await
}

/// カテゴリ → パス の対応でオーケストレータを組み立てる
pub fn orchestrator(base: &str, routes: &[(LesionCategory, &str)], dispatch: DispatchMode) -> Orchestrator {
    let addresses: BTreeMap<LesionCategory, String> = routes
        .iter()
        .map(|(category, path)| (*category, format!("{}{}", base, path)))
        .collect();
    let client = DetectorClient::new(DetectorRegistry::new(addresses), TEST_TIMEOUT).unwrap();
    Orchestrator::new(client, dispatch)
}

/// 小さなPNG画像のバイト列
pub fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 20) as u8, (y * 20) as u8, 128])
    });
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn tiny_png_data_url() -> String {
    to_data_url("image/png", &tiny_png(8, 8))
}
