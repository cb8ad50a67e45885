//! API handlers for the Benefit Service

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use vandana_common::{Error, Role};

use crate::ledger::Ledger;
use crate::models::{
    ApplyRequest, EnrollRequest, MarkPaidRequest, RecordEventRequest, RejectRequest,
};

/// Shared application state
pub struct AppState {
    pub ledger: Mutex<Ledger>,
}

/// API error rendered as `{"error": {"code", "message", "field"?}}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub field: Option<String>,
}

impl ApiError {
    fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthenticated",
            message: message.into(),
            field: None,
        }
    }

    fn forbidden(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::FORBIDDEN,
            code: "forbidden",
            message: message.into(),
            field: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut error = serde_json::json!({
            "code": self.code,
            "message": self.message,
        });
        if let Some(field) = self.field {
            error["field"] = serde_json::json!(field);
        }

        (self.status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotFound { .. } => ApiError {
                status: StatusCode::NOT_FOUND,
                code: "not_found",
                message: err.to_string(),
                field: None,
            },
            Error::Validation { ref field, .. } => ApiError {
                status: StatusCode::BAD_REQUEST,
                code: "validation_error",
                field: Some(field.clone()),
                message: err.to_string(),
            },
            Error::State(_) => ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "state_error",
                message: err.to_string(),
                field: None,
            },
            Error::Conflict(_) => ApiError {
                status: StatusCode::CONFLICT,
                code: "conflict",
                message: err.to_string(),
                field: None,
            },
            other => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal_error",
                message: other.to_string(),
                field: None,
            },
        }
    }
}

/// Resolve the acting identity from the trusted gateway headers and check
/// its role. The ledger trusts this boundary completely; authentication
/// itself happens upstream.
fn authenticate(headers: &HeaderMap, required: Role) -> Result<String, ApiError> {
    let actor_id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthenticated("missing x-actor-id header"))?;

    let role: Role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthenticated("missing x-actor-role header"))?
        .parse()
        .map_err(|e: Error| ApiError::unauthenticated(e.to_string()))?;

    if role != required {
        return Err(ApiError::forbidden(format!(
            "operation requires the {:?} role",
            required
        )));
    }

    Ok(actor_id.to_string())
}

/// Health check
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let mut ledger = state.ledger.lock().await;

    match ledger.health_check().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "service": "benefit-service"
        }))
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Redis connection failed: {}", e),
        )
            .into_response(),
    }
}

/// Enroll a beneficiary and create their installment ledger
pub async fn enroll_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&headers, Role::Caseworker)?;

    let mut ledger = state.ledger.lock().await;
    let response = ledger.enroll(payload).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Ingest a program event from an external record source
pub async fn record_event_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<RecordEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&headers, Role::Caseworker)?;

    let mut ledger = state.ledger.lock().await;
    let response = ledger.record_event(payload).await?;

    Ok(Json(response))
}

/// Beneficiary ledger summary
pub async fn get_summary_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let beneficiary_id = authenticate(&headers, Role::Beneficiary)?;

    let mut ledger = state.ledger.lock().await;
    let response = ledger.get_summary(&beneficiary_id).await?;

    Ok(Json(response))
}

/// Apply for an eligible installment
pub async fn apply_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ApplyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let beneficiary_id = authenticate(&headers, Role::Beneficiary)?;

    let mut ledger = state.ledger.lock().await;
    let response = ledger.apply(&beneficiary_id, payload).await?;

    Ok(Json(response))
}

/// Pending applications for caseworker review, oldest first
pub async fn list_pending_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&headers, Role::Caseworker)?;

    let mut ledger = state.ledger.lock().await;
    let pending = ledger.list_pending().await?;

    Ok(Json(pending))
}

/// Approve a submitted application
pub async fn approve_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((beneficiary_id, ordinal)): Path<(String, u8)>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&headers, Role::Caseworker)?;

    let mut ledger = state.ledger.lock().await;
    let response = ledger.approve(&beneficiary_id, ordinal).await?;

    Ok(Json(response))
}

/// Reject a submitted application with optional review notes
pub async fn reject_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((beneficiary_id, ordinal)): Path<(String, u8)>,
    payload: Option<Json<RejectRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&headers, Role::Caseworker)?;

    let review_notes = payload.and_then(|Json(p)| p.review_notes);

    let mut ledger = state.ledger.lock().await;
    let response = ledger.reject(&beneficiary_id, ordinal, review_notes).await?;

    Ok(Json(response))
}

/// Record the disbursement transaction for an approved application
pub async fn mark_paid_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((beneficiary_id, ordinal)): Path<(String, u8)>,
    Json(payload): Json<MarkPaidRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authenticate(&headers, Role::Caseworker)?;

    let mut ledger = state.ledger.lock().await;
    let response = ledger
        .mark_paid(&beneficiary_id, ordinal, &payload.transaction_id)
        .await?;

    Ok(Json(response))
}

/// Service stats
pub async fn get_stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let mut ledger = state.ledger.lock().await;
    let stats = ledger.stats().await?;

    Ok(Json(serde_json::json!({
        "service": "benefit-service",
        "stats": stats
    })))
}
