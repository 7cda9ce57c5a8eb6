//! HTTP API
//!
//! - `GET  /health`
//! - `POST /api/detect`            画像参照 + カテゴリ選択 → 集約結果
//! - `POST /api/patients`          レコード保存
//! - `GET  /api/patients/:id`      レコード取得
//! - `GET  /api/patients/:id/report.pdf`  PDFレポート

use crate::cli::PdfQuality;
use crate::config::Config;
use crate::error::{LesionVisionError, Result};
use crate::export::{render_record_pdf, report_file_stem};
use crate::inline::AssetInliner;
use crate::orchestrator::Orchestrator;
use crate::records::RecordStore;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lesion_vision_common::{CategorySelection, DetectionAggregate, PatientInfo, ScanSession};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const DETECTION_SUCCESS_MESSAGE: &str = "Detection completed successfully";
const DETECTION_MISSING_FIELDS_MESSAGE: &str = "Image and detection types are required";

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub records: RecordStore,
    pub inliner: AssetInliner,
    pub pdf_quality: PdfQuality,
}

impl AppState {
    pub fn from_config(config: &Config, pdf_quality: PdfQuality) -> Result<Self> {
        Ok(Self {
            orchestrator: Orchestrator::from_config(config)?,
            records: RecordStore::open(config.records_dir()?)?,
            inliner: AssetInliner::new(Duration::from_secs(config.timeout_seconds))?,
            pdf_quality,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DetectBody {
    #[serde(rename = "imageURL", alias = "imageReference", alias = "imageUrl")]
    image_url: Option<String>,
    #[serde(alias = "categories")]
    types: Option<CategorySelection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewPatientBody {
    #[serde(default)]
    patient_name: String,
    patient_age: Option<u32>,
    #[serde(default)]
    patient_gender: String,
    #[serde(default)]
    patient_phone: String,
    patient_lesion_image: Option<String>,
    #[serde(default)]
    lesions: DetectionAggregate,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/detect", post(detect))
        .route("/api/patients", post(create_patient))
        .route("/api/patients/:id", get(get_patient))
        .route("/api/patients/:id/report.pdf", get(get_patient_report))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// サーバーを起動（終了しない）
pub async fn serve(config: &Config, pdf_quality: PdfQuality) -> Result<()> {
    let state = Arc::new(AppState::from_config(config, pdf_quality)?);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        detectors = state.orchestrator.client().registry().configured_count(),
        "lesion-vision API listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn detect(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<DetectBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = payload.map_err(|rejection| {
        LesionVisionError::InvalidRequest(rejection.body_text())
    })?;

    let (image, types) = match (body.image_url, body.types) {
        (Some(image), Some(types)) if !image.trim().is_empty() => (image, types),
        _ => {
            return Err(LesionVisionError::InvalidRequest(
                DETECTION_MISSING_FIELDS_MESSAGE.into(),
            ))
        }
    };

    let results = state.orchestrator.detect(image.trim(), &types).await?;

    Ok(Json(json!({
        "success": true,
        "message": DETECTION_SUCCESS_MESSAGE,
        "results": results,
    })))
}

async fn create_patient(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<NewPatientBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = payload.map_err(|rejection| {
        LesionVisionError::InvalidRequest(rejection.body_text())
    })?;

    let session = ScanSession::from_parts(body.patient_lesion_image, body.lesions);
    let draft = session.to_draft(&PatientInfo {
        name: body.patient_name,
        age: body.patient_age,
        gender: body.patient_gender,
        contact: body.patient_phone,
    })?;

    let record = state.records.save(&draft)?;
    info!(id = record.id.as_deref().unwrap_or_default(), "patient record saved");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Patient record saved",
            "data": record,
        })),
    ))
}

async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let record = state.records.load(&id)?;
    Ok(Json(json!({ "success": true, "data": record })))
}

async fn get_patient_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let record = state.records.load(&id)?;
    let bytes = render_record_pdf(&record, &state.inliner, state.pdf_quality).await?;

    let disposition = format!("attachment; filename=\"{}.pdf\"", report_file_stem(&record));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

impl IntoResponse for LesionVisionError {
    fn into_response(self) -> Response {
        let status = match &self {
            LesionVisionError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
