//! Seams between the pipeline and the outside world.
//!
//! Weather and document providers have total contracts: they always hand back a
//! usable value and report absorbed failures through `Degradable`. The telemetry
//! store is the one boundary allowed to fail, because there is no sensible
//! default snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::degrade::Degradable;
use crate::domain::forecast::RainForecast;
use crate::domain::knowledge::RetrievedNote;
use crate::errors::{ApplicationError, IntegrationError};

#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn rain_forecast(&self) -> Degradable<RainForecast>;
}

#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// `query` describes the field state; retrieval is page-ordered, not ranked.
    async fn retrieve(&self, query: &str, k: usize) -> Degradable<Vec<RetrievedNote>>;
}

#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, IntegrationError>;
}

/// Reads and decodes the most recent sensor snapshot.
pub async fn load_snapshot(
    store: &dyn TelemetryStore,
    key: &str,
) -> Result<Value, ApplicationError> {
    let raw = store
        .get(key)
        .await?
        .ok_or_else(|| ApplicationError::SnapshotAbsent { key: key.to_string() })?;

    serde_json::from_str(&raw).map_err(|error| {
        ApplicationError::from(IntegrationError::Malformed(format!(
            "snapshot `{key}` is not valid JSON: {error}"
        )))
    })
}

#[derive(Default)]
pub struct InMemoryTelemetryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryTelemetryStore {
    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut entries = self.entries.write().await;
        entries.insert(key.into(), value.into());
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, IntegrationError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }
}
