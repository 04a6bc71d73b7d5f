use serde::Serialize;
use thiserror::Error;

/// Coarse classification of an absorbed integration failure, used for logging
/// and for deciding whether a fallback was a designed branch or a fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotConfigured,
    Transport,
    Timeout,
    HttpStatus,
    Malformed,
    Unsupported,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Transport => "transport",
            Self::Timeout => "timeout",
            Self::HttpStatus => "http_status",
            Self::Malformed => "malformed",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("unexpected http status {0}")]
    HttpStatus(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("unsupported format: {0}")]
    Unsupported(String),
}

impl IntegrationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotConfigured(_) => FailureKind::NotConfigured,
            Self::Transport(_) => FailureKind::Transport,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::HttpStatus(_) => FailureKind::HttpStatus,
            Self::Malformed(_) => FailureKind::Malformed,
            Self::Unsupported(_) => FailureKind::Unsupported,
        }
    }

    /// Absence of configuration is a designed branch, not a fault.
    pub fn is_configuration_absent(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("no telemetry snapshot found under key `{key}`")]
    SnapshotAbsent { key: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl From<IntegrationError> for ApplicationError {
    fn from(value: IntegrationError) -> Self {
        Self::Integration(value.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "No field telemetry is available yet. Please retry shortly.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::SnapshotAbsent { key } => Self::NotFound {
                message: format!("telemetry snapshot `{key}` is absent"),
                correlation_id,
            },
            ApplicationError::InvalidInput(message) => Self::BadRequest { message, correlation_id },
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}
