//! Conversion between the call protocol and the engine wire format

pub mod message;
pub mod metadata;
pub mod request;
pub mod response;

pub use message::normalize_prompt;
pub use metadata::{map_finish_reason, map_logprobs, map_usage};
pub use request::{BuiltRequest, JSON_STOP_SEQUENCE, build_request};
pub use response::finalize;
