//! Thin HTTP surface over [`GenerationGateway`]: one handler per mode.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    core::GenerationGateway,
    error::GatewayError,
    types::{ChatRequest, FormRequest, GenerationRequest, SurpriseRequest},
};

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<GenerationGateway>,
}

/// Gateway error as an HTTP response. Only the public message leaves the process.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(
            target: "wanderai::http",
            status = %rejection.status(),
            detail = %rejection.body_text(),
            "unreadable request body"
        );
        ApiError(GatewayError::Validation(
            "Request body must be a JSON object with the expected fields".to_string(),
        ))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::QuotaExhausted { .. } | GatewayError::Quota { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_client_error() {
            warn!(target: "wanderai::http", code = self.0.error_code(), error = %self.0);
        } else {
            error!(target: "wanderai::http", code = self.0.error_code(), error = %self.0);
        }
        (status, Json(self.0.to_error_payload())).into_response()
    }
}

pub fn router(gateway: Arc<GenerationGateway>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/ai/chat", post(chat))
        .route("/api/ai/form", post(form))
        .route("/api/ai/surprise", post(surprise))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { gateway })
}

pub async fn serve(gateway: Arc<GenerationGateway>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        target: "wanderai::http",
        %addr,
        credentials = gateway.credential_count(),
        model = gateway.model_name(),
        "itinerary gateway listening"
    );
    axum::serve(listener, router(gateway)).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "WanderAI API is running" }))
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    generate(&state, GenerationRequest::Chat(request)).await
}

async fn form(
    State(state): State<AppState>,
    body: Result<Json<FormRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    generate(&state, GenerationRequest::Form(request)).await
}

async fn surprise(
    State(state): State<AppState>,
    body: Result<Json<SurpriseRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    generate(&state, GenerationRequest::Surprise(request)).await
}

async fn generate(state: &AppState, request: GenerationRequest) -> Result<Json<Value>, ApiError> {
    let result = state.gateway.generate(request).await?;
    Ok(Json(result.to_response_body()))
}
