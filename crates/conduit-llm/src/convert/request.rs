//! Engine request construction

use conduit_config::GenerationConfig;

use super::message::normalize_prompt;
use crate::error::LlmError;
use crate::protocol::engine::{EngineRequest, ResponseFormat};
use crate::types::{CallOptions, CallWarning, Mode};

/// Closes the fenced block models tend to wrap JSON output in
pub const JSON_STOP_SEQUENCE: &str = "\n```";

/// Engine request plus what the caller needs to know about it
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltRequest {
    /// Request to send
    pub request: EngineRequest,
    /// Settings that were dropped
    pub warnings: Vec<CallWarning>,
    /// Normalized messages, echoed back as the raw prompt
    pub raw_prompt: serde_json::Value,
}

/// Build an engine request from call options
///
/// Call options take precedence over the configured generation defaults.
/// Unsupported sampling settings are dropped and reported as warnings.
///
/// # Errors
///
/// Returns [`LlmError::UnsupportedFunctionality`] for modes the engine cannot
/// serve or prompt content that cannot be normalized
pub fn build_request(
    model: &str,
    defaults: &GenerationConfig,
    options: CallOptions,
) -> Result<BuiltRequest, LlmError> {
    let CallOptions {
        mode,
        prompt,
        max_tokens,
        temperature,
        top_p,
        top_k,
        frequency_penalty,
        presence_penalty,
        stop_sequences,
        seed,
        logprobs,
        top_logprobs,
    } = options;

    let mode_name = mode.name();
    let (response_format, mut stop) = match mode {
        Mode::Regular => (ResponseFormat::Text, Vec::new()),
        Mode::ObjectJson { schema, .. } => (
            ResponseFormat::JsonObject {
                schema: Some(serde_json::to_string(&schema)?),
            },
            vec![JSON_STOP_SEQUENCE.to_owned()],
        ),
        Mode::ObjectTool { .. } => return Err(LlmError::unsupported(format!("{mode_name} mode"))),
    };
    stop.extend(stop_sequences);

    let mut warnings = Vec::new();
    if let Some(top_k) = top_k {
        tracing::debug!(top_k, "engine does not support topK, dropping it");
        warnings.push(CallWarning::UnsupportedSetting {
            setting: "topK".to_owned(),
            details: None,
        });
    }

    let top_logprobs = top_logprobs.or(defaults.top_logprobs);
    // The engine only returns alternatives when logprobs are switched on
    let logprobs = logprobs
        .or(defaults.logprobs)
        .or_else(|| top_logprobs.map(|_| true));

    let messages = normalize_prompt(&prompt)?;
    let raw_prompt = serde_json::to_value(&messages)?;

    let request = EngineRequest {
        model: model.to_owned(),
        messages,
        stop,
        response_format,
        temperature: temperature.or(defaults.temperature),
        top_p: top_p.or(defaults.top_p),
        max_tokens: max_tokens.or(defaults.max_tokens),
        frequency_penalty: frequency_penalty.or(defaults.frequency_penalty),
        presence_penalty: presence_penalty.or(defaults.presence_penalty),
        seed: seed.or(defaults.seed),
        logprobs,
        top_logprobs,
        n: 1,
        stream: None,
        stream_options: None,
    };

    Ok(BuiltRequest {
        request,
        warnings,
        raw_prompt,
    })
}
