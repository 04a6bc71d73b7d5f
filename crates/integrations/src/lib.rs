//! Adapters for the external collaborators of the advisory pipeline.
//!
//! - `weather`: OpenWeatherMap-compatible 3-hour forecast, aggregated to one day
//! - `knowledge`: page-ordered excerpts from a static reference document
//! - `telemetry`: latest sensor snapshot from a Redis-compatible key-value store
//!
//! Weather and knowledge adapters implement total contracts (`Degradable`);
//! the telemetry adapter reports failures because its caller owns that policy.

pub mod knowledge;
pub mod telemetry;
pub mod weather;

pub use knowledge::PagedDocumentRetriever;
pub use telemetry::RespTelemetryStore;
pub use weather::OpenWeatherProvider;
