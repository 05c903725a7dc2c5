//! Engine chat-completion wire format (OpenAI-compatible)

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnNull, serde_as};

use crate::error::ErrorCode;

// -- Request types --

/// Chat completion request sent to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages
    pub messages: Vec<EngineMessage>,
    /// Stop sequences, always present
    #[serde(default)]
    pub stop: Vec<String>,
    /// Output format
    pub response_format: ResponseFormat,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Frequency penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    /// Presence penalty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    /// Random seed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Return token log-probabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    /// Alternatives to return per token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    /// Number of choices to generate
    #[serde(default = "default_choice_count")]
    pub n: u32,
    /// Whether to stream the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Stream options (e.g. `include_usage`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<EngineStreamOptions>,
}

const fn default_choice_count() -> u32 {
    1
}

/// Engine stream options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStreamOptions {
    /// Send usage on the final chunk
    #[serde(default)]
    pub include_usage: bool,
}

/// Engine message, tagged by role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum EngineMessage {
    /// System instructions
    System {
        /// Text
        content: String,
    },
    /// User input
    User {
        /// Text or parts
        content: EngineUserContent,
    },
    /// Earlier model output
    Assistant {
        /// Concatenated text
        content: String,
        /// Requested tool calls
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<EngineToolCall>>,
    },
    /// Tool output
    Tool {
        /// Stringified result
        content: String,
        /// Call this result answers
        tool_call_id: String,
    },
}

/// User message body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EngineUserContent {
    /// Plain string
    Text(String),
    /// Ordered parts
    Parts(Vec<EngineContentPart>),
}

/// User content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineContentPart {
    /// Text
    Text {
        /// The text
        text: String,
    },
    /// Image reference
    ImageUrl {
        /// Image location
        image_url: EngineImageUrl,
    },
}

/// Image location, either a URL or a data URI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineImageUrl {
    /// URL or `data:` URI
    pub url: String,
    /// Resolution hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Tool call attached to an assistant message or reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineToolCall {
    /// Call identifier
    pub id: String,
    /// Always `function`
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function invocation
    pub function: EngineFunctionCall,
}

impl EngineToolCall {
    /// Function tool call
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_type: "function".to_owned(),
            function: EngineFunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// Function name and JSON-encoded arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineFunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as JSON text
    pub arguments: String,
}

/// Requested output format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text
    Text,
    /// JSON object, optionally constrained by a stringified schema
    JsonObject {
        /// JSON schema serialized as a string
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<String>,
    },
}

// -- Response types --

/// Non-streaming completion reply
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineReply {
    /// Completion identifier
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub id: String,
    /// Object type
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub object: String,
    /// Unix seconds
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub created: u64,
    /// Model that produced it
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub model: String,
    /// Generated choices
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub choices: Vec<EngineChoice>,
    /// Token accounting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<EngineUsage>,
}

/// One reply choice
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineChoice {
    /// Choice index
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub index: u32,
    /// Generated message
    pub message: EngineReplyMessage,
    /// Why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Token log-probabilities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<EngineLogprobs>,
}

/// Message within a reply choice
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineReplyMessage {
    /// Role, normally `assistant`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Generated text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Requested tool calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<EngineToolCall>>,
}

/// Engine token accounting; any field may be missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineUsage {
    /// Prompt tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,
    /// Completion tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
    /// Total tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

/// Log-probability block of a choice
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineLogprobs {
    /// Per-token entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<EngineTokenLogprob>>,
}

/// Log-probability of one token
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTokenLogprob {
    /// Token text
    pub token: String,
    /// Log-probability
    pub logprob: f64,
    /// UTF-8 bytes of the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    /// Most likely alternatives
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub top_logprobs: Vec<EngineTopLogprob>,
}

/// Alternative token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTopLogprob {
    /// Token text
    pub token: String,
    /// Log-probability
    pub logprob: f64,
    /// UTF-8 bytes of the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
}

// -- Streaming types --

/// One streamed completion chunk
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineChunk {
    /// Completion identifier, shared by all chunks of a stream
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub id: String,
    /// Object type
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub object: String,
    /// Unix seconds
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub created: u64,
    /// Model that produced it
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub model: String,
    /// Choice deltas
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub choices: Vec<EngineChunkChoice>,
    /// Token accounting, usually only on the last chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<EngineUsage>,
}

/// Delta for one choice
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineChunkChoice {
    /// Choice index
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub index: u32,
    /// Incremental content
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub delta: EngineDelta,
    /// Why generation stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Log-probabilities of the tokens in this delta
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<EngineLogprobs>,
}

/// Incremental message content
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineDelta {
    /// Role, on the first delta only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool call fragments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<EngineToolCallDelta>>,
}

/// Fragment of a tool call
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineToolCallDelta {
    /// Position in the tool call list
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub index: u32,
    /// Call identifier, usually on the first fragment only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `function` when present
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    /// Function fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<EngineFunctionDelta>,
}

/// Fragment of a function call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineFunctionDelta {
    /// Function name, usually on the first fragment only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fragment of the JSON arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

// -- Model listing --

/// Models available on the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineModelList {
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Available models
    #[serde(default)]
    pub data: Vec<EngineModel>,
}

/// An available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineModel {
    /// Model identifier
    pub id: String,
    /// Object type
    #[serde(default)]
    pub object: String,
    /// Owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

// -- Errors --

/// Failure body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineErrorResponse {
    /// Error detail
    pub error: EngineErrorDetail,
}

/// Failure detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineErrorDetail {
    /// Human-readable message
    pub message: String,
    /// Error category
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Offending parameter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<serde_json::Value>,
    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}
