use serde::{Deserialize, Serialize};

use crate::domain::forecast::RainForecast;
use crate::domain::sensor::SensorReading;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorySource {
    Llm,
    Fallback,
}

impl AdvisorySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Fallback => "fallback",
        }
    }
}

/// Composite output of one pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResult {
    #[serde(rename = "sensor_data")]
    pub sensor: SensorReading,
    #[serde(rename = "rain_forecast")]
    pub rain: RainForecast,
    #[serde(rename = "advisory")]
    pub advisory_text: String,
    pub source: AdvisorySource,
}

/// Stable external contract derived from an `AdvisoryResult`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResponse {
    pub recommendation: String,
    pub reasons: Vec<String>,
    pub source: AdvisorySource,
    pub meta: ResponseMeta,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub rain_forecast: RainForecast,
}
