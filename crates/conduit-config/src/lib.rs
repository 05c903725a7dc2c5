#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod engine;
mod env;
mod loader;
pub mod telemetry;

use serde::Deserialize;

pub use backend::*;
pub use engine::*;
pub use telemetry::{LogFormat, TelemetryConfig};

/// Top-level Conduit configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Completion engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// HTTP backend used by the bundled engine
    #[serde(default)]
    pub backend: BackendConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
