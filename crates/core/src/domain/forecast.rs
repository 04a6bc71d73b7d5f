use serde::{Deserialize, Serialize};

/// Number of 3-hour samples that make up "today" (the next 24 hours).
pub const SAMPLES_PER_DAY: usize = 8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RainForecast {
    pub today_rain_mm: f64,
    /// Highest probability of precipitation across the window, 0..=100.
    pub rain_prob: f64,
}

/// Forecast endpoint payload. Only the fields the aggregation reads are modelled.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForecastEnvelope {
    #[serde(default)]
    pub list: Vec<ForecastSample>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForecastSample {
    #[serde(default)]
    pub rain: Option<RainVolume>,
    /// Probability of precipitation, 0..=1.
    #[serde(default)]
    pub pop: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RainVolume {
    #[serde(rename = "3h", default)]
    pub three_hour_mm: Option<f64>,
}

impl ForecastSample {
    fn rain_mm(&self) -> f64 {
        self.rain
            .as_ref()
            .and_then(|rain| rain.three_hour_mm)
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
    }

    fn pop_percent(&self) -> f64 {
        self.pop.filter(|value| value.is_finite()).unwrap_or(0.0) * 100.0
    }
}

impl RainForecast {
    /// Aggregates the first day of samples. Returns `None` for an empty list so
    /// the caller can decide how to report it.
    pub fn from_samples(samples: &[ForecastSample]) -> Option<Self> {
        let window = &samples[..samples.len().min(SAMPLES_PER_DAY)];
        if window.is_empty() {
            return None;
        }

        let total_rain: f64 = window.iter().map(ForecastSample::rain_mm).sum();
        let peak_prob = window.iter().map(ForecastSample::pop_percent).fold(0.0_f64, f64::max);

        Some(Self {
            today_rain_mm: round_to(total_rain.max(0.0), 2),
            rain_prob: round_to(peak_prob.clamp(0.0, 100.0), 1),
        })
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}
