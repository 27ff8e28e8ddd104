//! HTTP API for alert ingestion.
//!
//! The submit handler orchestrates validation, video fetch, resolution
//! extraction, persistence, and notification. Every failure kind maps to
//! exactly one response class; nothing is retried here.

use crate::alert_store::{AlertStore, NewAlert, StoreError};
use crate::config::HttpConfig;
use crate::notifier::{format_timestamp, NotificationEvent, Notifier};
use crate::resolution::{DecodeError, ResolutionExtractor};
use crate::video_fetcher::{FetchError, VideoFetcher};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};
use uuid::Uuid;

/// Video file extensions accepted for alert submissions
const SUPPORTED_VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "webm"];

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn VideoFetcher>,
    pub extractor: Arc<dyn ResolutionExtractor>,
    pub store: Arc<dyn AlertStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Inbound alert submission
#[derive(Debug, Deserialize)]
pub struct AlertSubmission {
    /// Caller-supplied unique identifier
    pub uuid: Uuid,
    /// Video reference on the video server
    pub video: String,
    /// Event timestamp, seconds since epoch
    pub timestamp: f64,
    /// Store label
    pub store: String,
}

/// Successful submission response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub status: &'static str,
    pub resolution: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Request-level failures of the ingestion handler
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unsupported video format: {0}")]
    UnsupportedVideoFormat(String),

    #[error("Video server not reachable")]
    VideoServerUnreachable,

    #[error("Video not found on server")]
    VideoNotFound,

    #[error("Failed to extract resolution: {0}")]
    DecodeFailure(String),

    #[error("Alert with this UUID already exists")]
    DuplicateAlert,

    #[error("Alert store unavailable")]
    StorageUnavailable,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedVideoFormat(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::VideoServerUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::VideoNotFound => StatusCode::NOT_FOUND,
            ApiError::DecodeFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DuplicateAlert => StatusCode::CONFLICT,
            ApiError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::UnsupportedVideoFormat(_) => "VALIDATION_ERROR",
            ApiError::VideoServerUnreachable => "VIDEO_SERVER_UNREACHABLE",
            ApiError::VideoNotFound => "VIDEO_NOT_FOUND",
            ApiError::DecodeFailure(_) => "DECODE_ERROR",
            ApiError::DuplicateAlert => "DUPLICATE_ALERT",
            ApiError::StorageUnavailable => "STORAGE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });
        (self.status_code(), body).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::ServerUnreachable(_) => ApiError::VideoServerUnreachable,
            FetchError::NotFound(_) => ApiError::VideoNotFound,
        }
    }
}

impl From<DecodeError> for ApiError {
    fn from(err: DecodeError) -> Self {
        ApiError::DecodeFailure(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => ApiError::DuplicateAlert,
            StoreError::Unavailable(_) => ApiError::StorageUnavailable,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState, config: &HttpConfig) -> Router {
    let cors = if config.cors_enabled {
        if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/api/v1/alerts", post(submit_alert))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "alert-service"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "database": "disconnected",
                "error": e.to_string()
            })),
        ),
    }
}

/// Submit an alert for ingestion.
///
/// Validation happens before any I/O. The store's unique constraint on the
/// alert uuid is the only duplicate check; there is no lookup preceding the
/// insert, so concurrent submissions of the same uuid cannot race.
#[instrument(skip_all, fields(uuid = %submission.uuid, video = %submission.video))]
async fn submit_alert(
    State(state): State<AppState>,
    Json(submission): Json<AlertSubmission>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if !has_supported_extension(&submission.video) {
        return Err(ApiError::UnsupportedVideoFormat(submission.video.clone()));
    }

    let video_bytes = state.fetcher.fetch(&submission.video).await?;

    let resolution = state.extractor.extract(&video_bytes).await?;

    let candidate = NewAlert {
        uuid: submission.uuid,
        video: submission.video.clone(),
        store: submission.store.clone(),
        timestamp: submission.timestamp,
        resolution: resolution.to_string(),
    };

    let record = match state.store.insert(&candidate).await {
        Ok(record) => record,
        Err(StoreError::Duplicate) => {
            metrics::counter!("alerts.duplicates").increment(1);
            return Err(ApiError::DuplicateAlert);
        }
        Err(e) => return Err(e.into()),
    };

    metrics::counter!("alerts.ingested").increment(1);

    info!(
        id = record.id,
        resolution = %record.resolution,
        "Alert ingested"
    );

    // Observability only: the notification outcome never affects the response.
    let event = NotificationEvent {
        store: record.store.clone(),
        date: format_timestamp(record.timestamp),
        resolution: record.resolution.clone(),
    };
    state.notifier.notify(&event).await;

    Ok(Json(SubmitResponse {
        status: "success",
        resolution: record.resolution,
    }))
}

/// Check whether a video reference ends in an allow-listed extension
fn has_supported_extension(video: &str) -> bool {
    video
        .rsplit_once('.')
        .map(|(_, ext)| {
            SUPPORTED_VIDEO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Start the alert API server
pub async fn start_api_server(state: AppState, config: &HttpConfig) -> Result<()> {
    let router = create_router(state, config);
    let addr = format!("{}:{}", config.host, config.port);

    info!(address = %addr, "Starting alert API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, router)
        .await
        .context("API server error")?;

    Ok(())
}
