use super::result::{FinishReason, LogProb, ResponseMetadata, Usage};
use crate::error::LlmError;

/// Normalized streaming event
///
/// A stream starts with one `ResponseMetadata` and ends with exactly one
/// `Finish` or `Error`.
#[derive(Debug)]
pub enum StreamEvent {
    /// Identity of the completion, taken from the first chunk
    ResponseMetadata(ResponseMetadata),
    /// Generated text fragment
    TextDelta {
        /// Fragment exactly as the engine sent it
        text: String,
    },
    /// Tool call fragment
    ToolCallDelta {
        /// Call identifier, empty when the chunk omitted it
        tool_call_id: String,
        /// Function name, empty when the chunk omitted it
        tool_name: String,
        /// Fragment of the JSON arguments
        args_text_delta: String,
    },
    /// Normal end of stream
    Finish {
        /// Last reason reported
        finish_reason: FinishReason,
        /// Last usage reported
        usage: Usage,
        /// All log-probabilities in arrival order
        logprobs: Option<Vec<LogProb>>,
    },
    /// Stream failed; nothing follows
    Error {
        /// What went wrong
        cause: LlmError,
    },
}
