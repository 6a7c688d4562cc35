//! HTTP routes over the report store.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use siiec_envelope::ALGORITHM;
use siiec_store::{ReportFilter, ReportId, ReportStore, ReportSubmission, ReportUpdate, StoreError};

use crate::config::ServerConfig;

/// Room for plaintext report metadata on top of the envelope ceiling.
const METADATA_HEADROOM: usize = 64 * 1024;

const REQUIRED_FIELDS: [&str; 6] = ["id", "category", "type", "encryptedData", "encryptedKey", "iv"];

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub store: ReportStore,
    pub development: bool,
    pub started: Instant,
}

pub type Shared = Arc<AppState>;

impl AppState {
    pub fn new(store: ReportStore, development: bool) -> Self {
        Self {
            store,
            development,
            started: Instant::now(),
        }
    }

    fn fail(&self, err: StoreError) -> ApiError {
        ApiError::from_store(err, self.development)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": error.into() }),
        }
    }

    /// 500 with the detail shown only in development.
    fn internal(detail: impl std::fmt::Display, development: bool) -> Self {
        tracing::error!(error = %detail, "internal error");
        let mut body = json!({ "error": "Internal server error" });
        if development {
            body["message"] = Value::String(detail.to_string());
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body,
        }
    }

    fn from_store(err: StoreError, development: bool) -> Self {
        match &err {
            StoreError::MissingFields(missing) => Self {
                status: StatusCode::BAD_REQUEST,
                body: json!({
                    "error": "Missing required fields",
                    "missing": missing,
                    "required": REQUIRED_FIELDS,
                }),
            },
            StoreError::InvalidField { .. } | StoreError::EmptyUpdate => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            StoreError::PayloadTooLarge { .. } => Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string()),
            StoreError::DuplicateReport(_) => Self::new(StatusCode::CONFLICT, err.to_string()),
            StoreError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "Report not found"),
            StoreError::Storage(_) => Self::internal(err, development),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match &rejection {
            JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
            _ => rejection.status(),
        };
        Self::new(status, rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

fn report_id(state: &AppState, raw: &str) -> Result<ReportId, ApiError> {
    ReportId::parse(raw).map_err(|e| state.fail(e))
}

// ---------------------------------------------------------------------------
// Routes: service
// ---------------------------------------------------------------------------

async fn health(State(state): State<Shared>) -> Json<Value> {
    let decryption = if state.store.is_decryption_available() {
        "available"
    } else {
        "unavailable"
    };
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "decryption": decryption,
        "uptime": state.started.elapsed().as_secs_f64(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn public_key(State(state): State<Shared>) -> Result<Json<Value>, ApiError> {
    let key = state
        .store
        .keys()
        .public_key()
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Public key not configured"))?;
    let pem = key
        .to_public_key_pem()
        .map_err(|e| ApiError::internal(e, state.development))?;
    let fingerprint = key
        .fingerprint()
        .map_err(|e| ApiError::internal(e, state.development))?;

    Ok(Json(json!({
        "publicKey": pem,
        "fingerprint": fingerprint,
        "algorithm": ALGORITHM,
    })))
}

async fn stats(State(state): State<Shared>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.store.stats().await.map_err(|e| state.fail(e))?;
    Ok(Json(stats))
}

async fn map_points(State(state): State<Shared>) -> Result<impl IntoResponse, ApiError> {
    let points = state.store.map_points().await.map_err(|e| state.fail(e))?;
    Ok(Json(points))
}

// ---------------------------------------------------------------------------
// Routes: reports
// ---------------------------------------------------------------------------

async fn submit_report(
    State(state): State<Shared>,
    payload: Result<Json<ReportSubmission>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(submission) = payload?;
    let receipt = state.store.submit(submission).await.map_err(|e| state.fail(e))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "id": receipt.id,
            "createdAt": receipt.created_at,
            "message": "Report submitted successfully",
            "decryption": receipt.decryption,
        })),
    ))
}

async fn list_reports(
    State(state): State<Shared>,
    filter: Result<Query<ReportFilter>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(filter) = filter?;
    let reports = state.store.list(&filter).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({
        "success": true,
        "count": reports.len(),
        "reports": reports,
    })))
}

async fn get_report(State(state): State<Shared>, Path(id): Path<String>) -> Result<impl IntoResponse, ApiError> {
    let id = report_id(&state, &id)?;
    let view = state.store.get(&id).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({ "success": true, "report": view })))
}

async fn update_report(
    State(state): State<Shared>,
    Path(id): Path<String>,
    payload: Result<Json<ReportUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = report_id(&state, &id)?;
    let Json(update) = payload?;
    let report = state.store.update(&id, update).await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({
        "success": true,
        "report": {
            "id": report.id,
            "status": report.status,
            "assignedTo": report.assigned_to,
            "trustScore": report.trust_score,
            "updatedAt": report.updated_at,
        },
    })))
}

async fn cleanup_reports(State(state): State<Shared>) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.store.purge().await.map_err(|e| state.fail(e))?;
    Ok(Json(json!({
        "success": true,
        "deleted": deleted,
        "message": format!("Successfully deleted {} reports", deleted),
    })))
}

async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Endpoint not found")
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn app(state: Shared, config: &ServerConfig) -> Router {
    let body_limit = config.max_envelope_bytes.saturating_add(METADATA_HEADROOM);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/public-key", get(public_key))
        .route("/api/stats", get(stats))
        .route("/api/map", get(map_points))
        .route("/api/reports", get(list_reports).post(submit_report))
        .route("/api/reports/cleanup", delete(cleanup_reports))
        .route("/api/reports/:id", get(get_report).patch(update_report))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&config.allowed_origins))
        .with_state(state)
}
