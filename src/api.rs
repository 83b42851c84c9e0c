// src/api.rs
//! HTTP surface: classify single texts, batches and uploads; export tables.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::batch::{classify_batch, classify_one, ClassificationResult};
use crate::classify::{remote::build_remote_from_config, TriggerClassifier};
use crate::config::{RemoteConfig, TriggerConfig};
use crate::export::{
    to_csv, to_xlsx, Delimiter, ExportError, TableLayout, CSV_FILE_NAME, XLSX_FILE_NAME,
};
use crate::ingest::{read_upload, InputError};
use crate::tone::{summarize, ToneBucket};

/// Uploads above this size are rejected by the body limit layer.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ENV_CSV_DELIMITER: &str = "CSV_DELIMITER";

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<TriggerClassifier>,
    pub layout: TableLayout,
    pub delimiter: Delimiter,
}

impl AppState {
    pub fn new(classifier: TriggerClassifier) -> Self {
        let layout = TableLayout::for_config(classifier.config());
        Self {
            classifier: Arc::new(classifier),
            layout,
            delimiter: Delimiter::default(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Build from on-disk/env configuration (see `config`).
    pub fn from_env() -> anyhow::Result<Self> {
        let triggers = Arc::new(TriggerConfig::load_default()?);
        let remote_cfg = RemoteConfig::load_default();
        let remote = build_remote_from_config(&remote_cfg);
        let classifier =
            TriggerClassifier::new(triggers, remote).with_remote_timeout(remote_cfg.timeout());
        info!(
            labels = classifier.candidate_labels().len(),
            remote = classifier.remote_provider(),
            "classifier ready"
        );

        let delimiter = match std::env::var(ENV_CSV_DELIMITER) {
            Ok(raw) => raw.parse::<Delimiter>().map_err(|e: String| anyhow::anyhow!(e))?,
            Err(_) => Delimiter::default(),
        };
        Ok(Self::new(classifier).with_delimiter(delimiter))
    }

    fn tone_summary(&self, results: &[ClassificationResult]) -> Vec<ToneBucket> {
        match self.classifier.config().tone_map() {
            Some(tones) => summarize(results, tones),
            None => Vec::new(),
        }
    }

    fn analysis(&self, results: Vec<ClassificationResult>) -> AnalysisResponse {
        let tone_summary = self.tone_summary(&results);
        AnalysisResponse {
            results,
            tone_summary,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/classify", post(classify))
        .route("/classify/batch", post(classify_many))
        .route("/upload", post(upload))
        .route("/export/csv", post(export_csv))
        .route("/export/xlsx", post(export_xlsx))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Input(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Export(e) => {
                warn!(error = %e, "export failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/* ----------------------------
Handlers
---------------------------- */

#[derive(Deserialize)]
struct ClassifyReq {
    text: String,
}

#[derive(Deserialize)]
struct BatchReq {
    texts: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub results: Vec<ClassificationResult>,
    pub tone_summary: Vec<ToneBucket>,
}

#[derive(Deserialize)]
struct ExportReq {
    results: Vec<ClassificationResult>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadQuery {
    /// `csv` or `xlsx` returns a file instead of JSON.
    #[serde(default)]
    export: Option<String>,
}

async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyReq>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let row = classify_one(&state.classifier, &body.text).await?;
    Ok(Json(state.analysis(vec![row])))
}

async fn classify_many(
    State(state): State<AppState>,
    Json(body): Json<BatchReq>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let rows = classify_batch(&state.classifier, body.texts).await?;
    Ok(Json(state.analysis(rows)))
}

async fn upload(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("could not read upload: {e}")))?;
        file = Some((name, bytes.to_vec()));
        break;
    }
    let (name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("multipart field 'file' is missing".into()))?;

    let texts = read_upload(&name, &bytes)?;
    let rows = classify_batch(&state.classifier, texts).await?;
    info!(file = %name, rows = rows.len(), "upload classified");

    match q.export.as_deref() {
        None => Ok(Json(state.analysis(rows)).into_response()),
        Some("csv") => Ok(csv_response(&state, &rows)?),
        Some("xlsx") => Ok(xlsx_response(&state, &rows)?),
        Some(other) => Err(ApiError::BadRequest(format!(
            "unknown export format '{other}', expected csv or xlsx"
        ))),
    }
}

async fn export_csv(
    State(state): State<AppState>,
    Json(body): Json<ExportReq>,
) -> Result<Response, ApiError> {
    csv_response(&state, &body.results)
}

async fn export_xlsx(
    State(state): State<AppState>,
    Json(body): Json<ExportReq>,
) -> Result<Response, ApiError> {
    xlsx_response(&state, &body.results)
}

fn csv_response(state: &AppState, rows: &[ClassificationResult]) -> Result<Response, ApiError> {
    let bytes = to_csv(rows, state.layout, state.delimiter)?;
    Ok(attachment("text/csv; charset=utf-8", CSV_FILE_NAME, bytes))
}

fn xlsx_response(state: &AppState, rows: &[ClassificationResult]) -> Result<Response, ApiError> {
    let summary = state.tone_summary(rows);
    let bytes = to_xlsx(rows, &summary, state.layout)?;
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        XLSX_FILE_NAME,
        bytes,
    ))
}

fn attachment(content_type: &'static str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
