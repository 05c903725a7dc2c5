//! Prompt normalization into engine chat messages

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::error::LlmError;
use crate::protocol::engine::{EngineContentPart, EngineImageUrl, EngineMessage, EngineToolCall, EngineUserContent};
use crate::types::{Content, ContentPart, ImageData, ImageDetail, Message, Role};

/// MIME type assumed for inline image bytes without a declared type
const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Convert a prompt into the engine's flat message list
///
/// Message order is preserved. A tool message expands into one engine
/// message per result.
///
/// # Errors
///
/// Returns [`LlmError::UnsupportedFunctionality`] when a content part
/// cannot be expressed for its role
pub fn normalize_prompt(prompt: &[Message]) -> Result<Vec<EngineMessage>, LlmError> {
    let mut messages = Vec::with_capacity(prompt.len());

    for message in prompt {
        match message.role {
            Role::System => messages.push(EngineMessage::System {
                content: system_text(&message.content)?,
            }),
            Role::User => messages.push(EngineMessage::User {
                content: user_content(&message.content)?,
            }),
            Role::Assistant => messages.push(assistant_message(&message.content)?),
            Role::Tool => tool_messages(&message.content, &mut messages)?,
        }
    }

    Ok(messages)
}

fn system_text(content: &Content) -> Result<String, LlmError> {
    let parts = match content {
        Content::Text(text) => return Ok(text.clone()),
        Content::Parts(parts) => parts,
    };

    let mut text = String::new();
    for part in parts {
        match part {
            ContentPart::Text { text: fragment } => text.push_str(fragment),
            ContentPart::Image { .. } | ContentPart::ToolCall { .. } | ContentPart::ToolResult { .. } => {
                return Err(unsupported_part(Role::System, part));
            }
        }
    }

    Ok(text)
}

fn user_content(content: &Content) -> Result<EngineUserContent, LlmError> {
    let parts = match content {
        Content::Text(text) => return Ok(EngineUserContent::Text(text.clone())),
        Content::Parts(parts) => parts,
    };

    if let [ContentPart::Text { text }] = parts.as_slice() {
        return Ok(EngineUserContent::Text(text.clone()));
    }

    let parts = parts
        .iter()
        .map(|part| match part {
            ContentPart::Text { text } => Ok(EngineContentPart::Text { text: text.clone() }),
            ContentPart::Image {
                image,
                mime_type,
                detail,
            } => Ok(EngineContentPart::ImageUrl {
                image_url: EngineImageUrl {
                    url: image_url(image, mime_type.as_deref()),
                    detail: detail.map(|d| detail_name(d).to_owned()),
                },
            }),
            ContentPart::ToolCall { .. } | ContentPart::ToolResult { .. } => Err(unsupported_part(Role::User, part)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(EngineUserContent::Parts(parts))
}

fn assistant_message(content: &Content) -> Result<EngineMessage, LlmError> {
    let parts = match content {
        Content::Text(text) => {
            return Ok(EngineMessage::Assistant {
                content: text.clone(),
                tool_calls: None,
            });
        }
        Content::Parts(parts) => parts,
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in parts {
        match part {
            ContentPart::Text { text: fragment } => text.push_str(fragment),
            ContentPart::ToolCall {
                tool_call_id,
                tool_name,
                args,
            } => tool_calls.push(EngineToolCall::function(
                tool_call_id.as_str(),
                tool_name.as_str(),
                args.to_string(),
            )),
            ContentPart::Image { .. } | ContentPart::ToolResult { .. } => {
                return Err(unsupported_part(Role::Assistant, part));
            }
        }
    }

    Ok(EngineMessage::Assistant {
        content: text,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    })
}

fn tool_messages(content: &Content, messages: &mut Vec<EngineMessage>) -> Result<(), LlmError> {
    let parts = match content {
        Content::Text(_) => return Err(LlmError::unsupported("plain text content in a tool message")),
        Content::Parts(parts) => parts,
    };

    for part in parts {
        match part {
            ContentPart::ToolResult {
                tool_call_id, result, ..
            } => messages.push(EngineMessage::Tool {
                content: result.to_string(),
                tool_call_id: tool_call_id.clone(),
            }),
            ContentPart::Text { .. } | ContentPart::Image { .. } | ContentPart::ToolCall { .. } => {
                return Err(unsupported_part(Role::Tool, part));
            }
        }
    }

    Ok(())
}

fn image_url(image: &ImageData, mime_type: Option<&str>) -> String {
    match image {
        ImageData::Url(url) => url.to_string(),
        ImageData::Bytes(bytes) => format!(
            "data:{};base64,{}",
            mime_type.unwrap_or(DEFAULT_IMAGE_MIME_TYPE),
            STANDARD.encode(bytes)
        ),
    }
}

const fn detail_name(detail: ImageDetail) -> &'static str {
    match detail {
        ImageDetail::Auto => "auto",
        ImageDetail::Low => "low",
        ImageDetail::High => "high",
    }
}

fn unsupported_part(role: Role, part: &ContentPart) -> LlmError {
    LlmError::unsupported(format!("{} part in a {} message", part.kind(), role.as_str()))
}
