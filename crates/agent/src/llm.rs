//! Hosted language model capability.
//!
//! The capability is chosen once, from configuration: either an active
//! `HostedChatClient` or the `NoopLlmClient`. Callers only see `LlmClient`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldcast_core::config::AppConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("hosted model is not configured")]
    Unavailable,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("unexpected http status {0}")]
    HttpStatus(u16),
    #[error("malformed completion: {0}")]
    Malformed(String),
    #[error("completion contained no text")]
    Empty,
    #[error("prompt rendering failed: {0}")]
    Prompt(String),
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::HttpStatus(_) => "http_status",
            Self::Malformed(_) => "malformed",
            Self::Empty => "empty",
            Self::Prompt(_) => "prompt",
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Whether this capability can ever produce a completion.
    fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Stand-in used when no credential (or no provider) is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLlmClient;

#[async_trait]
impl LlmClient for NoopLlmClient {
    fn is_available(&self) -> bool {
        false
    }

    async fn complete(&self, _request: &ChatRequest) -> Result<String, LlmError> {
        Err(LlmError::Unavailable)
    }
}

/// OpenAI-compatible `chat/completions` client (Hugging Face router, OpenAI, Ollama).
pub struct HostedChatClient {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
    timeout: Duration,
}

impl HostedChatClient {
    pub fn new(
        client: Client,
        base_url: &str,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            timeout,
        }
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for HostedChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = CompletionBody {
            model: &self.model,
            messages: [
                Message { role: "system", content: &request.system },
                Message { role: "user", content: &request.user },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let mut builder = self.client.post(&self.endpoint).json(&body).timeout(self.timeout);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| self.classify(error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::HttpStatus(status.as_u16()));
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|error| self.classify(error))?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Malformed("response has no choices".to_string()))?;

        if text.trim().is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(text)
    }
}

impl HostedChatClient {
    fn classify(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout { secs: self.timeout.as_secs() }
        } else if error.is_decode() {
            LlmError::Malformed(error.without_url().to_string())
        } else {
            LlmError::Transport(error.without_url().to_string())
        }
    }
}

/// Selects the model capability for this process.
pub fn build_llm_client(client: Client, config: &AppConfig) -> Arc<dyn LlmClient> {
    if !config.has_llm_credential() {
        return Arc::new(NoopLlmClient);
    }

    let api_key = config.llm.api_key.clone().filter(|key| !key.expose_secret().trim().is_empty());
    Arc::new(HostedChatClient::new(
        client,
        config.llm_base_url(),
        api_key,
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use fieldcast_core::config::{AppConfig, LlmProvider};
    use reqwest::Client;
    use serde_json::{json, Value};

    use super::{build_llm_client, ChatRequest, HostedChatClient, LlmClient, LlmError, NoopLlmClient};

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn request() -> ChatRequest {
        ChatRequest {
            system: "advisor".to_string(),
            user: "Soil Moisture: 20 %".to_string(),
            max_tokens: 280,
            temperature: 0.2,
        }
    }

    fn client_for(base_url: &str, timeout_secs: u64) -> HostedChatClient {
        HostedChatClient::new(
            Client::new(),
            base_url,
            Some("hf_test_token".to_string().into()),
            "meta-llama/Llama-3.3-70B-Instruct",
            Duration::from_secs(timeout_secs),
        )
    }

    #[tokio::test]
    async fn noop_client_is_unavailable() {
        let client = NoopLlmClient;
        assert!(!client.is_available());
        assert_eq!(client.complete(&request()).await, Err(LlmError::Unavailable));
    }

    #[test]
    fn capability_follows_credential_presence() {
        let mut config = AppConfig::default();
        assert!(!build_llm_client(Client::new(), &config).is_available());

        config.llm.api_key = Some("hf_token".to_string().into());
        assert!(build_llm_client(Client::new(), &config).is_available());

        config.llm.api_key = None;
        config.llm.provider = LlmProvider::Ollama;
        assert!(build_llm_client(Client::new(), &config).is_available());
    }

    #[tokio::test]
    async fn sends_chat_completion_and_returns_text_verbatim() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    == Some("Bearer hf_test_token");
                let shaped = body["model"] == "meta-llama/Llama-3.3-70B-Instruct"
                    && body["messages"][0]["role"] == "system"
                    && body["messages"][1]["content"] == "Soil Moisture: 20 %"
                    && body["max_tokens"] == 280;
                if !(authorized && shaped) {
                    return StatusCode::BAD_REQUEST.into_response();
                }
                Json(json!({
                    "choices": [{ "message": { "role": "assistant", "content": "- Irrigate 10mm tonight\n- Recheck at dawn" } }]
                }))
                .into_response()
            }),
        );
        let base_url = spawn_server(router).await;

        let text = client_for(&format!("{base_url}/v1/"), 5)
            .complete(&request())
            .await
            .expect("completion succeeds");
        assert_eq!(text, "- Irrigate 10mm tonight\n- Recheck at dawn");
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let router = Router::new()
            .route("/denied/chat/completions", post(|| async { StatusCode::UNAUTHORIZED }))
            .route(
                "/blank/chat/completions",
                post(|| async { Json(json!({ "choices": [{ "message": { "content": "  " } }] })) }),
            )
            .route("/none/chat/completions", post(|| async { Json(json!({ "choices": [] })) }))
            .route(
                "/slow/chat/completions",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Json(json!({ "choices": [] }))
                }),
            );
        let base_url = spawn_server(router).await;

        let denied = client_for(&format!("{base_url}/denied"), 5).complete(&request()).await;
        assert_eq!(denied, Err(LlmError::HttpStatus(401)));

        let blank = client_for(&format!("{base_url}/blank"), 5).complete(&request()).await;
        assert_eq!(blank, Err(LlmError::Empty));

        let none = client_for(&format!("{base_url}/none"), 5).complete(&request()).await;
        assert!(matches!(none, Err(LlmError::Malformed(_))));

        let slow = client_for(&format!("{base_url}/slow"), 1).complete(&request()).await;
        assert_eq!(slow, Err(LlmError::Timeout { secs: 1 }));
    }
}
