use std::path::{Path, PathBuf};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use fieldcast_core::config::AppConfig;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    weather_configured: bool,
    llm_configured: bool,
    document_path: PathBuf,
}

impl HealthState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            weather_configured: config.has_weather_key(),
            llm_configured: config.has_llm_credential(),
            document_path: config.knowledge.document_path.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub weather_forecast: Capability,
    pub hosted_model: Capability,
    pub reference_document: Capability,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub capabilities: Capabilities,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// The service is ready whenever it is up: missing capabilities only mean fallback values.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let capabilities = Capabilities {
        weather_forecast: if state.weather_configured {
            Capability { status: "configured", detail: "live rain forecast".to_string() }
        } else {
            Capability { status: "fallback", detail: "zero rain forecast".to_string() }
        },
        hosted_model: if state.llm_configured {
            Capability { status: "configured", detail: "model-written advisories".to_string() }
        } else {
            Capability { status: "fallback", detail: "rule-based advisories".to_string() }
        },
        reference_document: document_check(&state.document_path).await,
    };

    let payload =
        HealthResponse { status: "ready", capabilities, checked_at: Utc::now().to_rfc3339() };
    (StatusCode::OK, Json(payload))
}

async fn document_check(path: &Path) -> Capability {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {
            Capability { status: "configured", detail: format!("`{}` is present", path.display()) }
        }
        _ => Capability {
            status: "fallback",
            detail: format!("`{}` is missing; prompts carry no reference notes", path.display()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_fallback_capabilities_without_configuration() {
        let state = HealthState {
            weather_configured: false,
            llm_configured: false,
            document_path: PathBuf::from("does/not/exist.txt"),
        };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.capabilities.weather_forecast.status, "fallback");
        assert_eq!(payload.capabilities.hosted_model.status, "fallback");
        assert_eq!(payload.capabilities.reference_document.status, "fallback");
    }

    #[tokio::test]
    async fn health_reports_configured_capabilities() {
        let state = HealthState {
            weather_configured: true,
            llm_configured: true,
            document_path: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml")),
        };

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.capabilities.weather_forecast.status, "configured");
        assert_eq!(payload.capabilities.hosted_model.status, "configured");
        assert_eq!(payload.capabilities.reference_document.status, "configured");
        assert!(!payload.checked_at.is_empty());
    }
}
