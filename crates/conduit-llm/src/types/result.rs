use serde::{Deserialize, Serialize};

use super::stream::StreamEvent;
use crate::stream::EventStream;

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// Natural end or stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// Output withheld by a content filter
    ContentFilter,
    /// Model requested tool calls
    ToolCalls,
    /// Engine reported an error
    Error,
    /// Unrecognized engine value
    Other,
    /// Engine never reported a reason
    Unknown,
}

/// Token accounting for one call
///
/// `None` marks a count the engine never reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: Option<u32>,
    /// Tokens generated
    pub completion_tokens: Option<u32>,
}

impl Usage {
    /// Both counts unknown
    pub const fn unknown() -> Self {
        Self {
            prompt_tokens: None,
            completion_tokens: None,
        }
    }

    /// Both counts known
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: Some(completion_tokens),
        }
    }
}

/// Log-probability of one generated token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogProb {
    /// Generated token
    pub token: String,
    /// Its log-probability
    pub logprob: f64,
    /// Most likely alternatives at this position
    pub top_logprobs: Vec<TopLogProb>,
}

/// Alternative token at a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopLogProb {
    /// Candidate token
    pub token: String,
    /// Its log-probability
    pub logprob: f64,
}

/// Degraded but continuable condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CallWarning {
    /// Setting was dropped from the request
    UnsupportedSetting {
        /// Setting name as the caller spelled it
        setting: String,
        /// Extra context
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier
    pub tool_call_id: String,
    /// Function name
    pub tool_name: String,
    /// Arguments as the model produced them (JSON text)
    pub args: String,
}

/// What was actually sent to the engine, for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawCall {
    /// Normalized messages
    pub raw_prompt: serde_json::Value,
    /// Request settings without the messages
    pub raw_settings: serde_json::Map<String, serde_json::Value>,
}

/// Serialized engine request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestBody {
    /// Full request as JSON text
    pub body: String,
}

/// Identity of one completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseMetadata {
    /// Completion identifier
    pub id: String,
    /// Model that produced it
    pub model_id: String,
    /// Creation time reported by the engine
    pub timestamp: jiff::Timestamp,
}

impl ResponseMetadata {
    /// Build from engine fields; `created` is in Unix seconds
    pub fn new(id: impl Into<String>, model_id: impl Into<String>, created: u64) -> Self {
        let timestamp = i64::try_from(created)
            .ok()
            .and_then(|secs| jiff::Timestamp::from_second(secs).ok())
            .unwrap_or(jiff::Timestamp::UNIX_EPOCH);

        Self {
            id: id.into(),
            model_id: model_id.into(),
            timestamp,
        }
    }
}

/// Preferred way to generate objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectGenerationMode {
    /// JSON response format
    Json,
    /// Forced tool call
    Tool,
}

/// Result of a non-streaming call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResult {
    /// Generated text
    pub text: String,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// Why generation stopped
    pub finish_reason: FinishReason,
    /// Token accounting
    pub usage: Usage,
    /// Per-token log-probabilities, when the engine produced any
    pub logprobs: Option<Vec<LogProb>>,
    /// What was sent
    pub raw_call: RawCall,
    /// Settings that were dropped
    pub warnings: Vec<CallWarning>,
    /// Serialized request
    pub request: RequestBody,
    /// Completion identity
    pub response: ResponseMetadata,
}

/// Result of a streaming call
#[derive(Debug)]
pub struct StreamResult {
    /// Normalized events
    pub stream: EventStream,
    /// What was sent
    pub raw_call: RawCall,
    /// Settings that were dropped
    pub warnings: Vec<CallWarning>,
    /// Serialized request
    pub request: RequestBody,
}

impl StreamResult {
    /// Pull the next event
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.stream.next_event().await
    }
}
