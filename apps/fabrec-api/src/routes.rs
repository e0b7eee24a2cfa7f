use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use fabrec_service::{ChatRequest, ChatResponse, PolicyStatus, ServiceError, StatusResponse};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/status", get(status))
        .with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/admin/policy/reload", post(reload_policy))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.service.chat(payload).await?;
    Ok(Json(response))
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.service.status().await)
}

async fn reload_policy(State(state): State<AppState>) -> Result<Json<PolicyStatus>, ApiError> {
    let response = state.service.reload_policy().await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match &err {
            ServiceError::InvalidRequest { .. } => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", err.to_string())
            }
            ServiceError::Retrieval { .. } => {
                ApiError::new(StatusCode::BAD_GATEWAY, "retrieval_failed", err.to_string())
            }
            ServiceError::Policy { .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "policy_reload_failed",
                err.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
