//! Fieldcast core - domain types and contracts for the irrigation advisory pipeline
//!
//! This crate holds everything that is independent of network transports:
//! - Sensor normalization (`domain::sensor`)
//! - Rain forecast aggregation rules (`domain::forecast`)
//! - Reference note shaping (`domain::knowledge`)
//! - Advisory results and the stable response contract (`domain::advisory`, `response`)
//! - Provider seams for weather, documents and telemetry (`ports`)
//! - Layered configuration (`config`) and error taxonomy (`errors`)
//!
//! # Degrade-gracefully contract
//!
//! Every provider returns a `Degradable<T>`: a value that is always usable,
//! plus the failure that was absorbed to produce it, if any. Callers never
//! need a catch-all to keep the pipeline alive.

pub mod config;
pub mod degrade;
pub mod domain;
pub mod errors;
pub mod ports;
pub mod response;

pub use degrade::Degradable;
pub use domain::advisory::{AdvisoryResponse, AdvisoryResult, AdvisorySource, ResponseMeta};
pub use domain::forecast::RainForecast;
pub use domain::knowledge::RetrievedNote;
pub use domain::sensor::{SensorPayload, SensorReading};
pub use errors::{ApplicationError, FailureKind, IntegrationError, InterfaceError};
pub use ports::{ForecastProvider, KnowledgeRetriever, TelemetryStore};
pub use response::to_response;
