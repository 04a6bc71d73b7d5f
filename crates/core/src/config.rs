use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::knowledge::DEFAULT_TOP_K;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub location: LocationConfig,
    pub weather: WeatherConfig,
    pub llm: LlmConfig,
    pub knowledge: KnowledgeConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub host: String,
    pub port: u16,
    pub key: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
}

#[derive(Clone, Debug)]
pub struct WeatherConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    pub document_path: PathBuf,
    pub top_k: usize,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    HuggingFace,
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::HuggingFace => "https://router.huggingface.co/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub city: Option<String>,
    pub document_path: Option<PathBuf>,
    pub weather_api_key: Option<String>,
    pub weather_base_url: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub telemetry_host: Option<String>,
    pub telemetry_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telemetry: TelemetryConfig {
                host: "localhost".to_string(),
                port: 6379,
                key: "sensor_data".to_string(),
                timeout_secs: 3,
            },
            location: LocationConfig {
                latitude: 22.7196,
                longitude: 75.8577,
                city: "Indore".to_string(),
            },
            weather: WeatherConfig {
                api_key: None,
                base_url: "https://api.openweathermap.org/data/2.5".to_string(),
                timeout_secs: 6,
            },
            llm: LlmConfig {
                provider: LlmProvider::HuggingFace,
                api_key: None,
                base_url: None,
                model: "meta-llama/Llama-3.3-70B-Instruct".to_string(),
                timeout_secs: 30,
                max_tokens: 280,
                temperature: 0.2,
            },
            knowledge: KnowledgeConfig {
                document_path: PathBuf::from("data/wheat_guide.txt"),
                top_k: DEFAULT_TOP_K,
                timeout_secs: 5,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hugging_face" | "huggingface" | "hf" => Ok(Self::HuggingFace),
            "open_ai" | "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected hugging_face|open_ai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("fieldcast.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Base URL for chat completions, falling back to the provider default.
    pub fn llm_base_url(&self) -> &str {
        self.llm.base_url.as_deref().unwrap_or_else(|| self.llm.provider.default_base_url())
    }

    pub fn has_weather_key(&self) -> bool {
        has_secret(self.weather.api_key.as_ref())
    }

    pub fn has_llm_credential(&self) -> bool {
        !self.llm.provider.requires_api_key() || has_secret(self.llm.api_key.as_ref())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telemetry) = patch.telemetry {
            if let Some(host) = telemetry.host {
                self.telemetry.host = host;
            }
            if let Some(port) = telemetry.port {
                self.telemetry.port = port;
            }
            if let Some(key) = telemetry.key {
                self.telemetry.key = key;
            }
            if let Some(timeout_secs) = telemetry.timeout_secs {
                self.telemetry.timeout_secs = timeout_secs;
            }
        }

        if let Some(location) = patch.location {
            if let Some(latitude) = location.latitude {
                self.location.latitude = latitude;
            }
            if let Some(longitude) = location.longitude {
                self.location.longitude = longitude;
            }
            if let Some(city) = location.city {
                self.location.city = city;
            }
        }

        if let Some(weather) = patch.weather {
            if let Some(weather_api_key_value) = weather.api_key {
                self.weather.api_key = Some(secret_value(weather_api_key_value));
            }
            if let Some(base_url) = weather.base_url {
                self.weather.base_url = base_url;
            }
            if let Some(timeout_secs) = weather.timeout_secs {
                self.weather.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(knowledge) = patch.knowledge {
            if let Some(document_path) = knowledge.document_path {
                self.knowledge.document_path = document_path;
            }
            if let Some(top_k) = knowledge.top_k {
                self.knowledge.top_k = top_k;
            }
            if let Some(timeout_secs) = knowledge.timeout_secs {
                self.knowledge.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FIELDCAST_TELEMETRY_HOST").or_else(|| read_env("REDIS_HOST"))
        {
            self.telemetry.host = value;
        }
        if let Some(value) = read_env("FIELDCAST_TELEMETRY_PORT") {
            self.telemetry.port = parse_u16("FIELDCAST_TELEMETRY_PORT", &value)?;
        } else if let Some(value) = read_env("REDIS_PORT") {
            self.telemetry.port = parse_u16("REDIS_PORT", &value)?;
        }
        if let Some(value) = read_env("FIELDCAST_TELEMETRY_KEY") {
            self.telemetry.key = value;
        }
        if let Some(value) = read_env("FIELDCAST_TELEMETRY_TIMEOUT_SECS") {
            self.telemetry.timeout_secs = parse_u64("FIELDCAST_TELEMETRY_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FIELDCAST_LOCATION_LATITUDE") {
            self.location.latitude = parse_f64("FIELDCAST_LOCATION_LATITUDE", &value)?;
        }
        if let Some(value) = read_env("FIELDCAST_LOCATION_LONGITUDE") {
            self.location.longitude = parse_f64("FIELDCAST_LOCATION_LONGITUDE", &value)?;
        }
        if let Some(value) = read_env("FIELDCAST_LOCATION_CITY") {
            self.location.city = value;
        }

        let weather_key =
            read_env("FIELDCAST_WEATHER_API_KEY").or_else(|| read_env("WEATHER_API_KEY"));
        if let Some(value) = weather_key {
            self.weather.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FIELDCAST_WEATHER_BASE_URL") {
            self.weather.base_url = value;
        }
        if let Some(value) = read_env("FIELDCAST_WEATHER_TIMEOUT_SECS") {
            self.weather.timeout_secs = parse_u64("FIELDCAST_WEATHER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FIELDCAST_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("FIELDCAST_LLM_API_KEY").or_else(|| read_env("HF_TOKEN")) {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FIELDCAST_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("FIELDCAST_LLM_MODEL").or_else(|| read_env("HF_MODEL")) {
            self.llm.model = value;
        }
        if let Some(value) = read_env("FIELDCAST_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("FIELDCAST_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("FIELDCAST_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("FIELDCAST_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("FIELDCAST_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("FIELDCAST_LLM_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("FIELDCAST_KNOWLEDGE_DOCUMENT_PATH") {
            self.knowledge.document_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("FIELDCAST_KNOWLEDGE_TOP_K") {
            self.knowledge.top_k = parse_usize("FIELDCAST_KNOWLEDGE_TOP_K", &value)?;
        }
        if let Some(value) = read_env("FIELDCAST_KNOWLEDGE_TIMEOUT_SECS") {
            self.knowledge.timeout_secs = parse_u64("FIELDCAST_KNOWLEDGE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("FIELDCAST_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FIELDCAST_SERVER_PORT") {
            self.server.port = parse_u16("FIELDCAST_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("FIELDCAST_LOGGING_LEVEL").or_else(|| read_env("FIELDCAST_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("FIELDCAST_LOGGING_FORMAT").or_else(|| read_env("FIELDCAST_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(city) = overrides.city {
            self.location.city = city;
        }
        if let Some(document_path) = overrides.document_path {
            self.knowledge.document_path = document_path;
        }
        if let Some(weather_api_key) = overrides.weather_api_key {
            self.weather.api_key = Some(secret_value(weather_api_key));
        }
        if let Some(weather_base_url) = overrides.weather_base_url {
            self.weather.base_url = weather_base_url;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(telemetry_host) = overrides.telemetry_host {
            self.telemetry.host = telemetry_host;
        }
        if let Some(telemetry_port) = overrides.telemetry_port {
            self.telemetry.port = telemetry_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telemetry(&self.telemetry)?;
        validate_location(&self.location)?;
        validate_weather(&self.weather)?;
        validate_llm(&self.llm)?;
        validate_knowledge(&self.knowledge)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn has_secret(secret: Option<&SecretString>) -> bool {
    secret.map(|value| !value.expose_secret().trim().is_empty()).unwrap_or(false)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("fieldcast.toml"), PathBuf::from("config/fieldcast.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_http_url(key: &str, url: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!("{key} must start with http:// or https://")));
    }
    Ok(())
}

fn validate_telemetry(telemetry: &TelemetryConfig) -> Result<(), ConfigError> {
    if telemetry.host.trim().is_empty() {
        return Err(ConfigError::Validation("telemetry.host must not be empty".to_string()));
    }
    if telemetry.port == 0 {
        return Err(ConfigError::Validation(
            "telemetry.port must be greater than zero".to_string(),
        ));
    }
    if telemetry.key.trim().is_empty() {
        return Err(ConfigError::Validation("telemetry.key must not be empty".to_string()));
    }
    validate_timeout("telemetry.timeout_secs", telemetry.timeout_secs)
}

fn validate_location(location: &LocationConfig) -> Result<(), ConfigError> {
    if !(-90.0..=90.0).contains(&location.latitude) {
        return Err(ConfigError::Validation(
            "location.latitude must be in range -90..=90".to_string(),
        ));
    }
    if !(-180.0..=180.0).contains(&location.longitude) {
        return Err(ConfigError::Validation(
            "location.longitude must be in range -180..=180".to_string(),
        ));
    }
    Ok(())
}

fn validate_weather(weather: &WeatherConfig) -> Result<(), ConfigError> {
    validate_http_url("weather.base_url", &weather.base_url)?;
    validate_timeout("weather.timeout_secs", weather.timeout_secs)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    validate_timeout("llm.timeout_secs", llm.timeout_secs)?;

    if let Some(base_url) = &llm.base_url {
        validate_http_url("llm.base_url", base_url)?;
    }
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    Ok(())
}

fn validate_knowledge(knowledge: &KnowledgeConfig) -> Result<(), ConfigError> {
    if knowledge.top_k == 0 || knowledge.top_k > 20 {
        return Err(ConfigError::Validation("knowledge.top_k must be in range 1..=20".to_string()));
    }
    validate_timeout("knowledge.timeout_secs", knowledge.timeout_secs)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telemetry: Option<TelemetryPatch>,
    location: Option<LocationPatch>,
    weather: Option<WeatherPatch>,
    llm: Option<LlmPatch>,
    knowledge: Option<KnowledgePatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelemetryPatch {
    host: Option<String>,
    port: Option<u16>,
    key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LocationPatch {
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherPatch {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct KnowledgePatch {
    document_path: Option<PathBuf>,
    top_k: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const FIELDCAST_VARS: &[&str] = &[
        "FIELDCAST_WEATHER_API_KEY",
        "WEATHER_API_KEY",
        "FIELDCAST_LLM_API_KEY",
        "HF_TOKEN",
        "HF_MODEL",
        "FIELDCAST_LLM_MODEL",
        "FIELDCAST_LLM_PROVIDER",
        "FIELDCAST_LOCATION_CITY",
        "FIELDCAST_LOCATION_LATITUDE",
        "FIELDCAST_KNOWLEDGE_TOP_K",
        "FIELDCAST_LOG_LEVEL",
        "FIELDCAST_LOG_FORMAT",
        "FIELDCAST_TELEMETRY_PORT",
        "REDIS_PORT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_any_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(FIELDCAST_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.has_weather_key(), "weather key should be unset by default")?;
        ensure(!config.has_llm_credential(), "hosted model credential should be unset")?;
        ensure(config.weather.timeout_secs == 6, "weather timeout should default to 6s")?;
        ensure(config.knowledge.top_k == 3, "top_k should default to 3")?;
        ensure(config.llm.max_tokens == 280, "max_tokens should default to 280")?;
        ensure(config.telemetry.key == "sensor_data", "telemetry key default")?;
        ensure(
            config.llm_base_url() == "https://router.huggingface.co/v1",
            "hugging face router should be the default base url",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(FIELDCAST_VARS);

        env::set_var("TEST_FIELDCAST_WEATHER_KEY", "owm-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fieldcast.toml");
            fs::write(
                &path,
                r#"
[weather]
api_key = "${TEST_FIELDCAST_WEATHER_KEY}"

[location]
city = "Bhopal"

[knowledge]
document_path = "guides/wheat.txt"
top_k = 2
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config
                    .weather
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret() == "owm-from-env")
                    .unwrap_or(false),
                "weather key should be interpolated from environment",
            )?;
            ensure(config.location.city == "Bhopal", "city should come from file")?;
            ensure(
                config.knowledge.document_path == PathBuf::from("guides/wheat.txt"),
                "document path should come from file",
            )?;
            ensure(config.knowledge.top_k == 2, "top_k should come from file")
        })();

        clear_vars(&["TEST_FIELDCAST_WEATHER_KEY"]);
        result
    }

    #[test]
    fn legacy_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(FIELDCAST_VARS);

        env::set_var("WEATHER_API_KEY", "owm-legacy");
        env::set_var("HF_TOKEN", "hf_legacy");
        env::set_var("HF_MODEL", "mistralai/Mistral-7B-Instruct");
        env::set_var("REDIS_PORT", "6380");
        env::set_var("FIELDCAST_LOG_LEVEL", "warn");
        env::set_var("FIELDCAST_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.has_weather_key(), "legacy weather key should be read")?;
            ensure(config.has_llm_credential(), "legacy hosted model token should be read")?;
            ensure(
                config.llm.model == "mistralai/Mistral-7B-Instruct",
                "legacy model id should be read",
            )?;
            ensure(config.telemetry.port == 6380, "legacy redis port should be read")?;
            ensure(config.logging.level == "warn", "log level alias should be read")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "log format alias")
        })();

        clear_vars(FIELDCAST_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(FIELDCAST_VARS);

        env::set_var("FIELDCAST_LOCATION_CITY", "Ujjain");
        env::set_var("FIELDCAST_LLM_MODEL", "from-env-model");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("fieldcast.toml");
            fs::write(
                &path,
                r#"
[location]
city = "Bhopal"

[llm]
model = "from-file-model"
provider = "ollama"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    city: Some("Dewas".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.location.city == "Dewas", "override city should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.llm.model == "from-env-model", "env model should win over file")?;
            ensure(config.llm.provider == LlmProvider::Ollama, "file provider should apply")?;
            ensure(
                config.has_llm_credential(),
                "ollama needs no api key, so the credential requirement is met",
            )
        })();

        clear_vars(FIELDCAST_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(FIELDCAST_VARS);

        env::set_var("FIELDCAST_LOCATION_LATITUDE", "123.0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("location.latitude")
            );
            ensure(has_message, "validation failure should mention location.latitude")
        })();

        clear_vars(FIELDCAST_VARS);
        result
    }

    #[test]
    fn malformed_numeric_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(FIELDCAST_VARS);

        env::set_var("FIELDCAST_KNOWLEDGE_TOP_K", "three");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "FIELDCAST_KNOWLEDGE_TOP_K", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override error".to_string()),
        };

        clear_vars(FIELDCAST_VARS);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(FIELDCAST_VARS);

        env::set_var("FIELDCAST_WEATHER_API_KEY", "owm-secret-value");
        env::set_var("FIELDCAST_LLM_API_KEY", "hf_secret_value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("owm-secret-value"), "debug output should not contain key")?;
            ensure(!debug.contains("hf_secret_value"), "debug output should not contain token")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )
        })();

        clear_vars(FIELDCAST_VARS);
        result
    }
}
