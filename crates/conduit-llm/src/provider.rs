//! Provider entry point

use std::sync::Arc;

use conduit_config::{Config, EngineConfig};

use crate::engine::{EngineFactory, HttpEngineFactory};
use crate::model::{ChatModel, ChatModelBuilder};

/// Name reported by models created here
pub const PROVIDER_NAME: &str = "conduit";

/// Creates chat models sharing one engine factory
#[derive(Clone)]
pub struct ConduitProvider {
    config: EngineConfig,
    factory: Arc<dyn EngineFactory>,
}

impl std::fmt::Debug for ConduitProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConduitProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConduitProvider {
    /// Provider using `factory` for every model
    pub fn new(config: EngineConfig, factory: Arc<dyn EngineFactory>) -> Self {
        Self { config, factory }
    }

    /// Provider backed by the HTTP engine described in `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.engine.clone(),
            Arc::new(HttpEngineFactory::new(config.backend.clone())),
        )
    }

    /// Chat model for the configured model
    pub fn language_model(&self) -> ChatModel {
        self.language_model_builder().build()
    }

    /// Builder for the configured model, to attach progress or a span
    pub fn language_model_builder(&self) -> ChatModelBuilder {
        ChatModel::builder(self.config.clone(), Arc::clone(&self.factory))
    }

    /// Chat model for another model identifier with the same settings
    pub fn chat_model(&self, model_id: impl Into<String>) -> ChatModel {
        let config = EngineConfig {
            model: model_id.into(),
            ..self.config.clone()
        };

        ChatModel::new(config, Arc::clone(&self.factory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::error::LlmError;
    use crate::model::LanguageModel;
    use crate::testing::ScriptedEngine;

    fn provider() -> ConduitProvider {
        let engine = ScriptedEngine::default();
        let factory: Arc<dyn EngineFactory> =
            Arc::new(move || -> Result<Arc<dyn Engine>, LlmError> { Ok(Arc::new(engine.clone())) });
        ConduitProvider::new(EngineConfig::for_model("phi"), factory)
    }

    #[test]
    fn language_model_uses_configured_model() {
        let model = provider().language_model();

        assert_eq!(model.model_id(), "phi");
        assert_eq!(model.provider(), PROVIDER_NAME);
    }

    #[test]
    fn chat_model_overrides_model_id() {
        assert_eq!(provider().chat_model("llama").model_id(), "llama");
    }

    #[test]
    fn from_config_builds_http_backed_provider() {
        let config = Config::parse("[engine]\nmodel = \"remote\"").unwrap();
        assert_eq!(ConduitProvider::from_config(&config).language_model().model_id(), "remote");
    }
}
