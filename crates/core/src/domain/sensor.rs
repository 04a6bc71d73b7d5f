use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Optional-field schema for an untrusted sensor payload.
///
/// Gateways publish readings under slightly different names; `moisture` is the
/// legacy alias for `soil_moisture`. Unknown keys are ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SensorPayload {
    #[serde(default)]
    pub soil_moisture: Option<Value>,
    #[serde(default)]
    pub moisture: Option<Value>,
    #[serde(default)]
    pub humidity: Option<Value>,
    #[serde(default)]
    pub tds: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
}

impl SensorPayload {
    /// Non-object inputs degrade to an empty payload.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Volumetric soil moisture, percent.
    pub soil_moisture: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    /// Total dissolved solids, ppm.
    pub tds: f64,
    /// Field temperature, degrees Celsius. May be negative.
    pub temperature: f64,
}

impl SensorReading {
    pub fn normalize(payload: &SensorPayload) -> Self {
        let soil_moisture = numeric(payload.soil_moisture.as_ref())
            .or_else(|| numeric(payload.moisture.as_ref()))
            .unwrap_or(0.0);

        Self {
            soil_moisture: non_negative(soil_moisture),
            humidity: non_negative(numeric(payload.humidity.as_ref()).unwrap_or(0.0)),
            tds: non_negative(numeric(payload.tds.as_ref()).unwrap_or(0.0)),
            temperature: numeric(payload.temperature.as_ref()).unwrap_or(0.0),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        Self::normalize(&SensorPayload::from_value(value))
    }
}

fn numeric(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|value| value.is_finite())
}

fn non_negative(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}
