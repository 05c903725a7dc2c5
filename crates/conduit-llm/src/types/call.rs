use serde::{Deserialize, Serialize};

use super::prompt::Prompt;

/// Options for one generate or stream call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallOptions {
    /// Output shaping mode
    pub mode: Mode,
    /// Conversation to complete
    pub prompt: Prompt,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    pub top_p: Option<f64>,
    /// Top-k sampling (not supported by the engine)
    pub top_k: Option<u32>,
    /// Frequency penalty
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    pub presence_penalty: Option<f64>,
    /// Caller stop sequences, appended after derived ones
    pub stop_sequences: Vec<String>,
    /// Random seed
    pub seed: Option<u64>,
    /// Return token log-probabilities
    pub logprobs: Option<bool>,
    /// Alternatives to return per token; implies `logprobs`
    pub top_logprobs: Option<u32>,
}

impl CallOptions {
    /// Regular-mode call over the given prompt
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            ..Self::default()
        }
    }

    /// Switch to the given mode
    #[must_use]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

/// Output shaping requested by the caller
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    /// Free-form text
    #[default]
    Regular,
    /// JSON object constrained by a schema
    ObjectJson {
        /// JSON schema for the object
        schema: serde_json::Value,
        /// Schema name
        name: Option<String>,
        /// Schema description
        description: Option<String>,
    },
    /// Object produced through a forced tool call
    ObjectTool {
        /// Tool the model must call
        tool: FunctionTool,
    },
}

impl Mode {
    /// JSON-object mode with the given schema
    pub fn object_json(schema: serde_json::Value) -> Self {
        Self::ObjectJson {
            schema,
            name: None,
            description: None,
        }
    }

    /// Mode name, as reported in errors
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::ObjectJson { .. } => "object-json",
            Self::ObjectTool { .. } => "object-tool",
        }
    }
}

/// Function exposed to the model as a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    /// Function name
    pub name: String,
    /// What the function does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema of the arguments
    pub parameters: serde_json::Value,
}
