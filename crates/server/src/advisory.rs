use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use fieldcast_agent::AdvisoryPipeline;
use fieldcast_core::ports::load_snapshot;
use fieldcast_core::{to_response, AdvisoryResponse, InterfaceError, TelemetryStore};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct AdvisoryState {
    pipeline: Arc<AdvisoryPipeline>,
    telemetry: Arc<dyn TelemetryStore>,
    telemetry_key: String,
}

impl AdvisoryState {
    pub fn new(
        pipeline: Arc<AdvisoryPipeline>,
        telemetry: Arc<dyn TelemetryStore>,
        telemetry_key: String,
    ) -> Self {
        Self { pipeline, telemetry, telemetry_key }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub correlation_id: String,
}

/// User-safe error response; internal detail stays in the logs.
pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AdvisoryState) -> Router {
    Router::new()
        .route("/api/advisory", post(advise))
        .route("/api/advisory/latest", post(advise_latest))
        .with_state(state)
}

/// Any body is accepted: unparseable or non-object payloads normalize to zero readings.
async fn advise(State(state): State<AdvisoryState>, body: Bytes) -> Json<AdvisoryResponse> {
    let correlation_id = Uuid::new_v4().to_string();
    let payload = parse_body(&body, &correlation_id);
    let result = state.pipeline.run_with_correlation(&payload, &correlation_id).await;
    Json(to_response(&result))
}

async fn advise_latest(
    State(state): State<AdvisoryState>,
) -> Result<Json<AdvisoryResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let payload =
        load_snapshot(state.telemetry.as_ref(), &state.telemetry_key).await.map_err(|error| {
            warn!(
                event_name = "advisory.snapshot.unavailable",
                correlation_id = %correlation_id,
                key = %state.telemetry_key,
                error = %error,
                "could not load telemetry snapshot"
            );
            ApiError(error.into_interface(correlation_id.clone()))
        })?;

    let result = state.pipeline.run_with_correlation(&payload, &correlation_id).await;
    Ok(Json(to_response(&result)))
}

fn parse_body(body: &[u8], correlation_id: &str) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or_else(|error| {
        warn!(
            event_name = "advisory.input.malformed",
            correlation_id,
            error = %error,
            "request body is not valid JSON; all readings default to 0"
        );
        Value::Null
    })
}
