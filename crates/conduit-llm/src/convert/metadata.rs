//! Engine enumerations mapped onto the call protocol

use crate::protocol::engine::{EngineLogprobs, EngineUsage};
use crate::types::{FinishReason, LogProb, TopLogProb, Usage};

/// Map an engine finish reason
///
/// Unrecognized values map to [`FinishReason::Other`], absence to
/// [`FinishReason::Unknown`].
pub fn map_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some("tool_calls" | "function_call") => FinishReason::ToolCalls,
        Some("error") => FinishReason::Error,
        Some(_) => FinishReason::Other,
        None => FinishReason::Unknown,
    }
}

/// Map engine log-probabilities positionally
///
/// Returns `None` when the engine sent no entries, keeping "not available"
/// distinct from an empty list.
pub fn map_logprobs(logprobs: Option<&EngineLogprobs>) -> Option<Vec<LogProb>> {
    let entries = logprobs?.content.as_ref()?;

    if entries.is_empty() {
        return None;
    }

    Some(
        entries
            .iter()
            .map(|entry| LogProb {
                token: entry.token.clone(),
                logprob: entry.logprob,
                top_logprobs: entry
                    .top_logprobs
                    .iter()
                    .map(|top| TopLogProb {
                        token: top.token.clone(),
                        logprob: top.logprob,
                    })
                    .collect(),
            })
            .collect(),
    )
}

/// Copy engine token counts, leaving absent fields unknown
pub fn map_usage(usage: Option<&EngineUsage>) -> Usage {
    usage.map_or_else(Usage::unknown, |usage| Usage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
    })
}
