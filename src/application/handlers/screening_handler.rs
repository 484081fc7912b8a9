use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::domain::entities::filter::{FilterRequest, FilterResponse};
use crate::domain::errors::ScreeningError;
use crate::domain::services::screening::ScreeningService;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(error: &ScreeningError) -> ApiError {
    let status = match error {
        ScreeningError::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
        ScreeningError::UniverseUnavailable(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn rejection_response(rejection: &JsonRejection) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: rejection.body_text(),
        }),
    )
}

/// Run one filter rule over the symbol universe
pub async fn filter_symbols(
    State(service): State<Arc<ScreeningService>>,
    payload: Result<Json<FilterRequest>, JsonRejection>,
) -> Result<Json<FilterResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Malformed filter request");
        rejection_response(&rejection)
    })?;

    match service.screen(&request).await {
        Ok(items) => Ok(Json(FilterResponse { items })),
        Err(e) => {
            warn!(rule = request.rule_name(), error = %e, "Filter request failed");
            Err(error_response(&e))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
