use serde::{Deserialize, Serialize};
use url::Url;

/// Ordered conversation sent to the model
pub type Prompt = Vec<Message>;

/// Author of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model
    System,
    /// End-user input
    User,
    /// Earlier model output
    Assistant,
    /// Results of tool invocations
    Tool,
}

impl Role {
    /// Lowercase name, as used in diagnostics
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A single message within a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message author
    pub role: Role,
    /// Message body
    pub content: Content,
}

impl Message {
    /// System message with plain text
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(text.into()),
        }
    }

    /// User message with plain text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::Text(text.into()),
        }
    }

    /// Assistant message with plain text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(text.into()),
        }
    }

    /// Message built from ordered content parts
    pub fn with_parts(role: Role, parts: Vec<ContentPart>) -> Self {
        Self {
            role,
            content: Content::Parts(parts),
        }
    }
}

/// Message body: collapsed text or ordered parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text
    Text(String),
    /// Ordered multi-part content
    Parts(Vec<ContentPart>),
}

/// Typed piece of message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentPart {
    /// Text fragment
    Text {
        /// The text
        text: String,
    },
    /// Image reference or inline image bytes
    Image {
        /// Image location or data
        image: ImageData,
        /// Declared MIME type of inline data
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
        /// Resolution hint for vision models
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<ImageDetail>,
    },
    /// Function invocation previously requested by the model
    ToolCall {
        /// Identifier linking the call to its result
        tool_call_id: String,
        /// Function name
        tool_name: String,
        /// Structured arguments
        args: serde_json::Value,
    },
    /// Output of a tool invocation
    ToolResult {
        /// Identifier of the originating call
        tool_call_id: String,
        /// Function name, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_name: Option<String>,
        /// Structured result value
        result: serde_json::Value,
    },
}

impl ContentPart {
    /// Text part shorthand
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Tag name of this part
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::ToolCall { .. } => "tool-call",
            Self::ToolResult { .. } => "tool-result",
        }
    }
}

/// Image payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageData {
    /// Remote or data URL, passed through untouched
    Url(Url),
    /// Raw encoded image bytes
    Bytes(Vec<u8>),
}

/// Vision resolution hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Let the engine decide
    Auto,
    /// Low resolution
    Low,
    /// High resolution
    High,
}
