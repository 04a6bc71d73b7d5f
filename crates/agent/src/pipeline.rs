use std::sync::Arc;

use fieldcast_core::config::AppConfig;
use fieldcast_core::domain::format_measure;
use fieldcast_core::{
    AdvisoryResult, ForecastProvider, IntegrationError, KnowledgeRetriever, RainForecast,
    SensorReading,
};
use fieldcast_integrations::{OpenWeatherProvider, PagedDocumentRetriever};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::generator::AdvisoryGenerator;
use crate::llm::build_llm_client;

/// Runs normalize -> forecast -> retrieve -> generate for one sensor payload.
///
/// A run never fails: each stage absorbs its own failure and hands a usable
/// value to the next one.
pub struct AdvisoryPipeline {
    forecast: Arc<dyn ForecastProvider>,
    knowledge: Arc<dyn KnowledgeRetriever>,
    generator: AdvisoryGenerator,
    top_k: usize,
}

impl AdvisoryPipeline {
    pub fn new(
        forecast: Arc<dyn ForecastProvider>,
        knowledge: Arc<dyn KnowledgeRetriever>,
        generator: AdvisoryGenerator,
        top_k: usize,
    ) -> Self {
        Self { forecast, knowledge, generator, top_k }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let http = Client::new();
        Self::new(
            Arc::new(OpenWeatherProvider::from_config(http.clone(), config)),
            Arc::new(PagedDocumentRetriever::from_config(&config.knowledge)),
            AdvisoryGenerator::from_config(build_llm_client(http, config), &config.llm),
            config.knowledge.top_k,
        )
    }

    pub async fn run(&self, payload: &Value) -> AdvisoryResult {
        let correlation_id = Uuid::new_v4().to_string();
        self.run_with_correlation(payload, &correlation_id).await
    }

    pub async fn run_with_correlation(&self, payload: &Value, correlation_id: &str) -> AdvisoryResult {
        let sensor = SensorReading::from_value(payload);
        debug!(
            event_name = "advisory.sensor.normalized",
            correlation_id,
            soil_moisture = sensor.soil_moisture,
            humidity = sensor.humidity,
            tds = sensor.tds,
            temperature = sensor.temperature,
            "sensor payload normalized"
        );

        let forecast = self.forecast.rain_forecast().await;
        if let Some(failure) = &forecast.failure {
            report_degraded("forecast", failure, correlation_id);
        }
        let rain = forecast.value;

        let query = build_query(&sensor, &rain);
        let retrieved = self.knowledge.retrieve(&query, self.top_k).await;
        if let Some(failure) = &retrieved.failure {
            report_degraded("knowledge", failure, correlation_id);
        }
        let notes = retrieved.value;

        let generated = self.generator.generate(&sensor, &rain, &notes, correlation_id).await;
        info!(
            event_name = "advisory.pipeline.completed",
            correlation_id,
            source = generated.source.as_str(),
            notes = notes.len(),
            today_rain_mm = rain.today_rain_mm,
            "advisory generated"
        );

        AdvisoryResult { sensor, rain, advisory_text: generated.text, source: generated.source }
    }
}

/// Retrieval query summarizing the field state.
pub fn build_query(sensor: &SensorReading, rain: &RainForecast) -> String {
    format!(
        "Soil Moisture: {}%, TDS: {} ppm, Temperature: {}C, Today Rain: {}mm",
        format_measure(sensor.soil_moisture),
        format_measure(sensor.tds),
        format_measure(sensor.temperature),
        format_measure(rain.today_rain_mm),
    )
}

fn report_degraded(stage: &'static str, failure: &IntegrationError, correlation_id: &str) {
    if failure.is_configuration_absent() {
        debug!(
            event_name = "advisory.stage.skipped",
            correlation_id,
            stage,
            reason = %failure,
            "stage not configured; using default value"
        );
    } else {
        warn!(
            event_name = "advisory.stage.degraded",
            correlation_id,
            stage,
            kind = failure.kind().as_str(),
            error = %failure,
            "stage failed; using default value"
        );
    }
}
