use serde::Deserialize;

/// Model loaded when the configuration does not name one
pub const DEFAULT_MODEL: &str = "phi-1_5-q4f16_1-MLC";

/// Completion engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Model identifier passed to the engine's load step
    #[serde(default = "default_model")]
    pub model: String,
    /// Host the engine on a dedicated worker thread instead of in-process
    #[serde(default)]
    pub worker: bool,
    /// Default generation parameters, overridable per call
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            worker: false,
            generation: GenerationConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Configuration for the given model with default settings
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

/// Sampling parameters applied when a call does not set them
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Frequency penalty (-2.0 to 2.0)
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty (-2.0 to 2.0)
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    /// Random seed for deterministic generation
    #[serde(default)]
    pub seed: Option<u64>,
    /// Return token log-probabilities
    #[serde(default)]
    pub logprobs: Option<bool>,
    /// Alternatives to return per token (0 to 20)
    #[serde(default)]
    pub top_logprobs: Option<u32>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}
