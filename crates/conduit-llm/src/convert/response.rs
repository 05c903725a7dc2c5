//! Non-streaming reply finalization

use super::metadata::{map_finish_reason, map_logprobs, map_usage};
use super::request::BuiltRequest;
use crate::error::LlmError;
use crate::protocol::engine::{EngineReply, EngineRequest};
use crate::types::{GenerateResult, RawCall, RequestBody, ResponseMetadata, ToolCall};

/// Map one engine reply onto the call result
///
/// # Errors
///
/// Returns [`LlmError::InvalidResponse`] if the reply has no choices, or a
/// serialization error if the request cannot be echoed
pub fn finalize(reply: EngineReply, built: BuiltRequest) -> Result<GenerateResult, LlmError> {
    let (raw_call, request) = describe_request(&built.request, built.raw_prompt)?;

    let usage = map_usage(reply.usage.as_ref());
    let response = ResponseMetadata::new(reply.id, reply.model, reply.created);

    let Some(choice) = reply.choices.into_iter().next() else {
        return Err(LlmError::InvalidResponse("reply contained no choices".to_owned()));
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            tool_call_id: call.id,
            tool_name: call.function.name,
            args: call.function.arguments,
        })
        .collect();

    Ok(GenerateResult {
        text: choice.message.content.unwrap_or_default(),
        tool_calls,
        finish_reason: map_finish_reason(choice.finish_reason.as_deref()),
        usage,
        logprobs: map_logprobs(choice.logprobs.as_ref()),
        raw_call,
        warnings: built.warnings,
        request,
        response,
    })
}

/// Diagnostic echo of a request
///
/// The raw settings omit `messages`, which the raw prompt already carries;
/// the body is the full serialized request.
pub(crate) fn describe_request(
    request: &EngineRequest,
    raw_prompt: serde_json::Value,
) -> Result<(RawCall, RequestBody), LlmError> {
    let body = serde_json::to_string(request)?;

    let serde_json::Value::Object(mut raw_settings) = serde_json::to_value(request)? else {
        return Err(LlmError::Internal(anyhow::anyhow!("engine request did not serialize to an object")));
    };
    raw_settings.remove("messages");

    Ok((
        RawCall {
            raw_prompt,
            raw_settings,
        },
        RequestBody { body },
    ))
}
