//! Provider-agnostic call protocol
//!
//! Callers describe a completion with these types; the adapter converts them
//! to the engine's wire format and back.

pub mod call;
pub mod prompt;
pub mod result;
pub mod stream;

pub use call::{CallOptions, FunctionTool, Mode};
pub use prompt::{Content, ContentPart, ImageData, ImageDetail, Message, Prompt, Role};
pub use result::{
    CallWarning, FinishReason, GenerateResult, LogProb, ObjectGenerationMode, RawCall, RequestBody, ResponseMetadata,
    StreamResult, ToolCall, TopLogProb, Usage,
};
pub use stream::StreamEvent;
