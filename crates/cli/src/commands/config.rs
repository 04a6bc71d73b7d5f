use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use fieldcast_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: &'static str,
    value: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct ConfigReport {
    command: &'static str,
    status: &'static str,
    precedence: &'static str,
    config_file: Option<String>,
    entries: Vec<ConfigEntry>,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2);
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields = vec![
        field(
            "telemetry.host",
            &["FIELDCAST_TELEMETRY_HOST", "REDIS_HOST"],
            config.telemetry.host.clone(),
        ),
        field(
            "telemetry.port",
            &["FIELDCAST_TELEMETRY_PORT", "REDIS_PORT"],
            config.telemetry.port.to_string(),
        ),
        field("telemetry.key", &["FIELDCAST_TELEMETRY_KEY"], config.telemetry.key.clone()),
        field(
            "telemetry.timeout_secs",
            &["FIELDCAST_TELEMETRY_TIMEOUT_SECS"],
            config.telemetry.timeout_secs.to_string(),
        ),
        field(
            "location.latitude",
            &["FIELDCAST_LOCATION_LATITUDE"],
            config.location.latitude.to_string(),
        ),
        field(
            "location.longitude",
            &["FIELDCAST_LOCATION_LONGITUDE"],
            config.location.longitude.to_string(),
        ),
        field("location.city", &["FIELDCAST_LOCATION_CITY"], config.location.city.clone()),
        field(
            "weather.api_key",
            &["FIELDCAST_WEATHER_API_KEY", "WEATHER_API_KEY"],
            redact_secret(config.weather.api_key.as_ref()),
        ),
        field("weather.base_url", &["FIELDCAST_WEATHER_BASE_URL"], config.weather.base_url.clone()),
        field(
            "weather.timeout_secs",
            &["FIELDCAST_WEATHER_TIMEOUT_SECS"],
            config.weather.timeout_secs.to_string(),
        ),
        field("llm.provider", &["FIELDCAST_LLM_PROVIDER"], format!("{:?}", config.llm.provider)),
        field(
            "llm.api_key",
            &["FIELDCAST_LLM_API_KEY", "HF_TOKEN"],
            redact_secret(config.llm.api_key.as_ref()),
        ),
        field("llm.base_url", &["FIELDCAST_LLM_BASE_URL"], config.llm_base_url().to_string()),
        field("llm.model", &["FIELDCAST_LLM_MODEL", "HF_MODEL"], config.llm.model.clone()),
        field(
            "llm.timeout_secs",
            &["FIELDCAST_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        field("llm.max_tokens", &["FIELDCAST_LLM_MAX_TOKENS"], config.llm.max_tokens.to_string()),
        field("llm.temperature", &["FIELDCAST_LLM_TEMPERATURE"], config.llm.temperature.to_string()),
        field(
            "knowledge.document_path",
            &["FIELDCAST_KNOWLEDGE_DOCUMENT_PATH"],
            config.knowledge.document_path.display().to_string(),
        ),
        field("knowledge.top_k", &["FIELDCAST_KNOWLEDGE_TOP_K"], config.knowledge.top_k.to_string()),
        field(
            "knowledge.timeout_secs",
            &["FIELDCAST_KNOWLEDGE_TIMEOUT_SECS"],
            config.knowledge.timeout_secs.to_string(),
        ),
        field(
            "server.bind_address",
            &["FIELDCAST_SERVER_BIND_ADDRESS"],
            config.server.bind_address.clone(),
        ),
        field("server.port", &["FIELDCAST_SERVER_PORT"], config.server.port.to_string()),
        field(
            "logging.level",
            &["FIELDCAST_LOGGING_LEVEL", "FIELDCAST_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["FIELDCAST_LOGGING_FORMAT", "FIELDCAST_LOG_FORMAT"],
            format!("{:?}", config.logging.format),
        ),
    ];

    let entries = fields
        .into_iter()
        .map(|(key, env_keys, value)| ConfigEntry {
            key,
            value,
            source: field_source(
                key,
                env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        })
        .collect();

    let report = ConfigReport {
        command: "config",
        status: "ok",
        precedence: "env > file > default",
        config_file: config_file_path.map(|path| path.display().to_string()),
        entries,
    };
    CommandResult::record(0, &report)
}

fn field(
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
) -> (&'static str, &'static [&'static str], String) {
    (key, env_keys, value)
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("fieldcast.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/fieldcast.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) =
        env_keys.iter().find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()))
    {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps a recognizable token prefix (`hf_`, `sk-`) and hides the rest.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };

    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.find(['-', '_']) {
        Some(index) if index <= 4 => format!("{}***", &trimmed[..=index]),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_are_never_echoed() {
        let hf: SecretString = "hf_abcdef123456".to_string().into();
        let openai: SecretString = "sk-proj-abcdef".to_string().into();
        let owm: SecretString = "0123456789abcdef".to_string().into();

        assert_eq!(redact_secret(Some(&hf)), "hf_***");
        assert_eq!(redact_secret(Some(&openai)), "sk-***");
        assert_eq!(redact_secret(Some(&owm)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: toml::Value = "[weather]\nbase_url = \"http://localhost\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "weather.base_url"));
        assert!(!contains_path(&doc, "weather.api_key"));
    }
}
