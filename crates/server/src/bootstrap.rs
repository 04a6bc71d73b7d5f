use std::sync::Arc;

use axum::Router;
use fieldcast_agent::AdvisoryPipeline;
use fieldcast_core::config::AppConfig;
use fieldcast_core::TelemetryStore;
use fieldcast_integrations::RespTelemetryStore;
use tracing::info;

use crate::advisory::{self, AdvisoryState};
use crate::health::{self, HealthState};

pub struct Application {
    pub config: AppConfig,
    pub pipeline: Arc<AdvisoryPipeline>,
    pub telemetry: Arc<dyn TelemetryStore>,
}

impl Application {
    pub fn router(&self) -> Router {
        advisory::router(AdvisoryState::new(
            self.pipeline.clone(),
            self.telemetry.clone(),
            self.config.telemetry.key.clone(),
        ))
        .merge(health::router(HealthState::from_config(&self.config)))
    }
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        weather_configured = config.has_weather_key(),
        llm_configured = config.has_llm_credential(),
        document = %config.knowledge.document_path.display(),
        "starting application bootstrap"
    );

    let pipeline = Arc::new(AdvisoryPipeline::from_config(&config));
    let telemetry: Arc<dyn TelemetryStore> = Arc::new(RespTelemetryStore::from_config(&config.telemetry));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        telemetry_store = %format!("{}:{}", config.telemetry.host, config.telemetry.port),
        "advisory pipeline wired"
    );

    Application { config, pipeline, telemetry }
}
