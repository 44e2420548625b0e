use crate::error::ForecastError;
use crate::server::service::{CategoryStats, DashboardService, ModelInfo, SeriesTable};
use crate::pipeline::ForecastMethod;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

pub const MAX_DAYS: usize = 60;

/// Error body returned by every endpoint: `{"success": false, "message": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        let status = match &err {
            ForecastError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ForecastError::InsufficientHistory { .. }
            | ForecastError::MissingCalendarCoverage { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        }
        let body = Json(serde_json::json!({
            "success": false,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub success: bool,
    pub data: SeriesTable,
    pub methods: BTreeMap<String, ForecastMethod>,
    pub fallback_reasons: BTreeMap<String, String>,
    pub period: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictionsQuery {
    pub days: Option<usize>,
}

/// Runs a blocking service call off the async runtime.
async fn blocking<T, F>(service: Arc<DashboardService>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&DashboardService) -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::internal(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

/// GET /api/predictions?days=N
///
/// # Errors
///
/// Returns 400 if `days` is outside `1..=60` and 500 when the data cannot be
/// loaded. A category that cannot be modelled is served from its baseline and
/// listed in `fallback_reasons`.
pub async fn predictions(
    State(service): State<Arc<DashboardService>>,
    Query(query): Query<PredictionsQuery>,
) -> Result<Json<PredictionsResponse>, ApiError> {
    let days = query.days.unwrap_or(service.config().model.horizon);
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(ApiError::bad_request(format!(
            "days must be between 1 and {MAX_DAYS}, got {days}"
        )));
    }

    let p = blocking(service, move |s| s.predictions(days)).await?;
    Ok(Json(PredictionsResponse {
        success: true,
        data: p.data,
        methods: p.methods,
        fallback_reasons: p.fallback_reasons,
        period: p.period,
        message: p.message,
    }))
}

/// GET /api/historical
///
/// # Errors
///
/// Returns 500 if a sales file cannot be loaded.
pub async fn historical(
    State(service): State<Arc<DashboardService>>,
) -> Result<Json<ApiResponse<SeriesTable>>, ApiError> {
    let table = blocking(service, |s| s.historical()).await?;
    Ok(ApiResponse::ok(table))
}

/// GET /api/stats
///
/// # Errors
///
/// Returns 500 if a sales file cannot be loaded.
pub async fn stats(
    State(service): State<Arc<DashboardService>>,
) -> Result<Json<ApiResponse<BTreeMap<String, CategoryStats>>>, ApiError> {
    let stats = blocking(service, |s| s.stats()).await?;
    Ok(ApiResponse::ok(stats))
}

/// GET /api/model-info
pub async fn model_info(
    State(service): State<Arc<DashboardService>>,
) -> Json<ApiResponse<ModelInfo>> {
    ApiResponse::ok(service.model_info())
}

pub async fn health() -> &'static str {
    "OK"
}
