//! Fieldcast agent - advisory generation and pipeline orchestration
//!
//! - `llm`: the hosted model capability (`HostedChatClient` or `NoopLlmClient`)
//! - `fallback`: deterministic rule-based advisory
//! - `generator`: prompt rendering and the model-or-fallback decision
//! - `pipeline`: normalize, forecast, retrieve, generate
//!
//! The model only phrases advice. Whether the pipeline produces a result never
//! depends on it: any model failure lands on the fallback text.

pub mod fallback;
pub mod generator;
pub mod llm;
pub mod pipeline;

pub use generator::{AdvisoryGenerator, GeneratedAdvisory};
pub use llm::{build_llm_client, ChatRequest, HostedChatClient, LlmClient, LlmError, NoopLlmClient};
pub use pipeline::AdvisoryPipeline;
