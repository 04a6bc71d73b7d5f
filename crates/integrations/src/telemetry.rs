//! Minimal RESP2 client for reading the latest sensor snapshot.
//!
//! Only `GET` is spoken. Each call opens one connection, sends the command,
//! reads a single reply and closes.

use std::time::Duration;

use async_trait::async_trait;
use fieldcast_core::config::TelemetryConfig;
use fieldcast_core::{IntegrationError, TelemetryStore};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Largest bulk reply accepted, matching the store's own `proto-max-bulk-len` default.
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

pub struct RespTelemetryStore {
    host: String,
    port: u16,
    timeout: Duration,
}

impl RespTelemetryStore {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self { host: host.into(), port, timeout }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.host.clone(), config.port, Duration::from_secs(config.timeout_secs))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn exchange(&self, key: &str) -> Result<Option<String>, IntegrationError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|error| transport(&self.address(), error))?;

        stream
            .write_all(&encode_command(&["GET", key]))
            .await
            .map_err(|error| transport(&self.address(), error))?;

        let mut reader = BufReader::new(stream);
        read_bulk_reply(&mut reader).await
    }
}

#[async_trait]
impl TelemetryStore for RespTelemetryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, IntegrationError> {
        tokio::time::timeout(self.timeout, self.exchange(key))
            .await
            .map_err(|_| IntegrationError::Timeout { secs: self.timeout.as_secs() })?
    }
}

fn transport(address: &str, error: std::io::Error) -> IntegrationError {
    IntegrationError::Transport(format!("telemetry store `{address}`: {error}"))
}

fn encode_command(parts: &[&str]) -> Vec<u8> {
    let mut encoded = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        encoded.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        encoded.extend_from_slice(part.as_bytes());
        encoded.extend_from_slice(b"\r\n");
    }
    encoded
}

async fn read_bulk_reply<R>(reader: &mut R) -> Result<Option<String>, IntegrationError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = String::new();
    let read = reader
        .read_line(&mut header)
        .await
        .map_err(|error| IntegrationError::Transport(error.to_string()))?;
    if read == 0 {
        return Err(IntegrationError::Malformed("connection closed before reply".to_string()));
    }

    let header = header.trim_end_matches(['\r', '\n']);
    let Some(tag) = header.chars().next() else {
        return Err(IntegrationError::Malformed("empty reply header".to_string()));
    };
    let body = &header[tag.len_utf8()..];

    match tag {
        '$' => {
            let length = body.parse::<i64>().map_err(|_| {
                IntegrationError::Malformed(format!("invalid bulk length `{body}`"))
            })?;
            if length < 0 {
                return Ok(None);
            }

            let length = usize::try_from(length)
                .ok()
                .filter(|length| *length <= MAX_BULK_LEN)
                .ok_or_else(|| {
                    IntegrationError::Malformed(format!(
                        "bulk length {length} exceeds {MAX_BULK_LEN} bytes"
                    ))
                })?;
            let mut payload = vec![0_u8; length + 2];
            reader
                .read_exact(&mut payload)
                .await
                .map_err(|error| IntegrationError::Malformed(format!("truncated reply: {error}")))?;
            payload.truncate(length);

            String::from_utf8(payload)
                .map(Some)
                .map_err(|_| IntegrationError::Malformed("snapshot is not UTF-8".to_string()))
        }
        '+' => Ok(Some(body.to_string())),
        '_' => Ok(None),
        '-' => Err(IntegrationError::Transport(format!("store replied with error: {body}"))),
        other => Err(IntegrationError::Malformed(format!("unexpected reply type `{other}`"))),
    }
}
