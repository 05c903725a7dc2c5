//! Streaming chat-completion adapter for Conduit
//!
//! Callers speak a provider-agnostic language model protocol
//! ([`LanguageModel`], [`CallOptions`], [`StreamEvent`]); the adapter shapes
//! engine requests, finalizes replies and translates engine chunk streams
//! into normalized events.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod convert;
pub mod engine;
pub mod error;
pub mod model;
pub mod protocol;
pub mod provider;
pub mod stream;
pub mod types;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineAccess, EngineFactory, Hosting, HttpEngine, HttpEngineFactory, WorkerEngine};
pub use error::{BackendError, LlmError, classify};
pub use model::{ChatModel, ChatModelBuilder, LanguageModel};
pub use provider::ConduitProvider;
pub use stream::EventStream;
pub use types::{CallOptions, GenerateResult, StreamEvent, StreamResult};
