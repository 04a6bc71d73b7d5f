use std::time::Duration;

use async_trait::async_trait;
use fieldcast_core::config::{AppConfig, LocationConfig, WeatherConfig};
use fieldcast_core::domain::forecast::{ForecastEnvelope, RainForecast};
use fieldcast_core::{Degradable, ForecastProvider, IntegrationError};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Rain forecast from an OpenWeatherMap-compatible `/forecast` endpoint.
///
/// Without an API key the provider answers with the zero forecast and never
/// touches the network.
pub struct OpenWeatherProvider {
    client: Client,
    api_key: Option<SecretString>,
    endpoint: String,
    location: LocationConfig,
    timeout: Duration,
}

impl OpenWeatherProvider {
    pub fn new(client: Client, weather: &WeatherConfig, location: &LocationConfig) -> Self {
        Self {
            client,
            api_key: weather.api_key.clone(),
            endpoint: format!("{}/forecast", weather.base_url.trim_end_matches('/')),
            location: location.clone(),
            timeout: Duration::from_secs(weather.timeout_secs),
        }
    }

    pub fn from_config(client: Client, config: &AppConfig) -> Self {
        Self::new(client, &config.weather, &config.location)
    }

    fn location_params(&self) -> Vec<(&'static str, String)> {
        let city = self.location.city.trim();
        if city.is_empty() {
            vec![
                ("lat", self.location.latitude.to_string()),
                ("lon", self.location.longitude.to_string()),
            ]
        } else {
            vec![("q", city.to_string())]
        }
    }

    pub async fn fetch(&self) -> Result<RainForecast, IntegrationError> {
        let api_key = self
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().trim())
            .filter(|key| !key.is_empty())
            .ok_or(IntegrationError::NotConfigured("weather.api_key"))?;

        let mut params = self.location_params();
        params.push(("appid", api_key.to_string()));
        params.push(("units", "metric".to_string()));

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| classify(error, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IntegrationError::HttpStatus(status.as_u16()));
        }

        let envelope: ForecastEnvelope =
            response.json().await.map_err(|error| classify(error, self.timeout))?;
        debug!(
            event_name = "advisory.weather.fetched",
            samples = envelope.list.len(),
            "forecast samples received"
        );

        RainForecast::from_samples(&envelope.list)
            .ok_or_else(|| IntegrationError::Malformed("forecast list is empty".to_string()))
    }
}

#[async_trait]
impl ForecastProvider for OpenWeatherProvider {
    async fn rain_forecast(&self) -> Degradable<RainForecast> {
        Degradable::from_result(self.fetch().await)
    }
}

/// Maps a transport error without echoing the request URL, which carries the API key.
fn classify(error: reqwest::Error, timeout: Duration) -> IntegrationError {
    if error.is_timeout() {
        return IntegrationError::Timeout { secs: timeout.as_secs() };
    }
    if error.is_decode() {
        return IntegrationError::Malformed(error.without_url().to_string());
    }
    IntegrationError::Transport(error.without_url().to_string())
}
