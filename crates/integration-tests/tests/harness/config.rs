//! Programmatic configuration builder for integration tests

use conduit_config::{BackendConfig, Config, EngineConfig, GenerationConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Configuration for `model` served by the mock engine at `base_url`
    pub fn new(model: &str, base_url: &str) -> Self {
        Self {
            config: Config {
                engine: EngineConfig::for_model(model),
                backend: BackendConfig {
                    base_url: Some(base_url.parse().expect("valid URL")),
                    api_key: None,
                },
                telemetry: None,
            },
        }
    }

    /// Host the engine on a worker thread
    pub fn with_worker(mut self) -> Self {
        self.config.engine.worker = true;
        self
    }

    /// Send a bearer token
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.config.backend.api_key = Some(SecretString::from(key));
        self
    }

    /// Set default generation parameters
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.config.engine.generation = generation;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Config {
        self.config
    }
}
