//! レポート出力テスト
//!
//! インライン化 → レポート組み立て → PDF描画 の一連の流れを検証

mod support;

use axum::{http::header, routing::get, Router};
use chrono::TimeZone;
use lesion_vision::cli::{ExportFormat, PdfQuality};
use lesion_vision::error::LesionVisionError;
use lesion_vision::export::{export_report, pdf::render_pdf, render_record_pdf};
use lesion_vision::inline::AssetInliner;
use lesion_vision_common::data_url::{decode_data_url, extract_mime_type_from_data_url};
use lesion_vision_common::{
    assemble_report, DetectionAggregate, DetectionOutcome, LesionCategory, PatientRecord,
};
use support::{spawn, tiny_png, tiny_png_data_url, TEST_TIMEOUT};
use tempfile::tempdir;

fn record(lesions: DetectionAggregate, image: Option<String>) -> PatientRecord {
    PatientRecord {
        id: Some("65a1b2c3d4e5f60718293a4b".into()),
        patient_name: "Jane Doe".into(),
        patient_age: 42,
        patient_gender: "Female".into(),
        patient_phone: "555-0100".into(),
        patient_lesion_image: image,
        created_at: chrono::Utc.with_ymd_and_hms(2026, 1, 5, 14, 30, 0).unwrap(),
        lesions,
    }
}

fn detected(mask: Option<String>, confidence: f64) -> DetectionOutcome {
    DetectionOutcome {
        succeeded: true,
        detected: true,
        confidence: Some(confidence),
        mask_image: mask.clone(),
        labeled_image: mask.clone(),
        heatmap_image: mask,
    }
}

/// 画像を返す偽のアセットサーバー
async fn spawn_asset_server() -> String {
    let png = tiny_png(16, 16);
    let app = Router::new()
        .route(
            "/typed.png",
            get({
                let png = png.clone();
                move || async move { ([(header::CONTENT_TYPE, "image/png")], png) }
            }),
        )
        .route(
            "/untyped",
            get(move || async move { ([(header::CONTENT_TYPE, "application/octet-stream")], png) }),
        );
    spawn(app).await
}

/// 検出なしのレコードでもPDFは1ページ出力される
#[test]
fn test_render_pdf_without_detections() {
    let mut lesions = DetectionAggregate::new();
    lesions.insert(LesionCategory::Streaks, DetectionOutcome::failure());

    let report = assemble_report(&record(lesions, None));
    assert_eq!(report.lesion_count(), 0);

    let bytes = render_pdf(&report, PdfQuality::Medium).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

/// インライン画像つきの全カテゴリ（改ページを含む）
#[test]
fn test_render_pdf_with_inline_images() {
    let image = tiny_png_data_url();
    let lesions: DetectionAggregate = LesionCategory::ALL
        .iter()
        .map(|c| (*c, detected(Some(image.clone()), 12.346)))
        .collect();

    let report = assemble_report(&record(lesions, Some(image)));
    assert_eq!(report.lesion_count(), 5);

    let bytes = render_pdf(&report, PdfQuality::Low).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

/// インライン化されていない画像が残っていればエラー
#[test]
fn test_render_pdf_rejects_remote_images() {
    let mut lesions = DetectionAggregate::new();
    lesions.insert(
        LesionCategory::Globules,
        detected(Some("https://x/mask.png".into()), 3.0),
    );

    let report = assemble_report(&record(lesions, None));
    let err = render_pdf(&report, PdfQuality::Low).unwrap_err();
    assert!(matches!(err, LesionVisionError::PdfGeneration(_)));
}

#[tokio::test]
async fn test_inline_fetches_and_detects_mime() {
    let base = spawn_asset_server().await;
    let inliner = AssetInliner::new(TEST_TIMEOUT).unwrap();

    let typed = inliner
        .inline(Some(&format!("{}/typed.png", base)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(extract_mime_type_from_data_url(&typed), Some("image/png"));
    assert_eq!(decode_data_url(&typed).unwrap(), tiny_png(16, 16));

    let sniffed = inliner
        .inline(Some(&format!("{}/untyped", base)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(extract_mime_type_from_data_url(&sniffed), Some("image/png"));
}

#[tokio::test]
async fn test_inline_missing_asset_is_error() {
    let base = spawn_asset_server().await;
    let inliner = AssetInliner::new(TEST_TIMEOUT).unwrap();

    let err = inliner
        .inline(Some(&format!("{}/missing.png", base)))
        .await
        .unwrap_err();
    assert!(matches!(err, LesionVisionError::AssetFetch(_)));
}

/// リモート参照のレコードを丸ごとインライン化してPDFに
#[tokio::test]
async fn test_render_record_pdf_inlines_remote_images() {
    let base = spawn_asset_server().await;
    let inliner = AssetInliner::new(TEST_TIMEOUT).unwrap();

    let mut lesions = DetectionAggregate::new();
    lesions.insert(
        LesionCategory::Streaks,
        DetectionOutcome {
            succeeded: true,
            detected: true,
            confidence: Some(4.0),
            mask_image: Some(format!("{}/typed.png", base)),
            labeled_image: Some(format!("{}/untyped", base)),
            heatmap_image: None,
        },
    );
    let remote = record(lesions, Some(format!("{}/typed.png", base)));

    let inlined = inliner.inline_record(&remote).await.unwrap();
    let outcome = &inlined.lesions[&LesionCategory::Streaks];
    assert!(outcome.mask_image.as_deref().unwrap().starts_with("data:image/png;base64,"));
    assert!(outcome.heatmap_image.is_none());

    let bytes = render_record_pdf(&remote, &inliner, PdfQuality::Medium).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

/// 掲載されない結果（検出なし・失敗）の画像は取得しない
#[tokio::test]
async fn test_render_record_pdf_skips_unreported_assets() {
    let inliner = AssetInliner::new(TEST_TIMEOUT).unwrap();
    let unreachable = "http://127.0.0.1:9/negative-mask.png".to_string();

    let mut lesions = DetectionAggregate::new();
    lesions.insert(LesionCategory::Streaks, detected(Some(tiny_png_data_url()), 8.0));
    lesions.insert(
        LesionCategory::Globules,
        DetectionOutcome {
            succeeded: true,
            detected: false,
            confidence: Some(0.0),
            mask_image: Some(unreachable.clone()),
            labeled_image: Some(unreachable.clone()),
            heatmap_image: None,
        },
    );
    let record = record(lesions, None);
    assert_eq!(assemble_report(&record).lesion_count(), 1);

    let inlined = inliner.inline_record(&record).await.unwrap();
    assert_eq!(
        inlined.lesions[&LesionCategory::Globules].mask_image.as_deref(),
        Some(unreachable.as_str())
    );

    let bytes = render_record_pdf(&record, &inliner, PdfQuality::Low).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_export_report_both_formats() {
    let dir = tempdir().expect("Failed to create temp dir");
    let inliner = AssetInliner::new(TEST_TIMEOUT).unwrap();

    let mut lesions = DetectionAggregate::new();
    lesions.insert(LesionCategory::MiliaLikeCysts, detected(Some(tiny_png_data_url()), 1.5));
    let record = record(lesions, None);

    let written = export_report(&record, &inliner, &ExportFormat::Both, dir.path(), PdfQuality::Low)
        .await
        .unwrap();

    assert_eq!(written.len(), 2);
    for path in &written {
        assert!(path.exists());
    }

    let json_path = dir.path().join("LesionVision_Report_Jane_Doe_20260105.json");
    let content = std::fs::read_to_string(json_path).unwrap();
    let report: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(report["analysisHeading"], "Lesion Analysis (1 Detected)");
}
