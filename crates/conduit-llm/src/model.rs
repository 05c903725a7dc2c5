//! Language model facade over the engine

use std::sync::Arc;

use async_trait::async_trait;
use conduit_config::{EngineConfig, GenerationConfig};
use tracing::Instrument;

use crate::convert::{build_request, finalize};
use crate::convert::response::describe_request;
use crate::engine::{Engine, EngineAccess, EngineFactory, Hosting, InitProgress, ProgressReporter};
use crate::error::LlmError;
use crate::protocol::engine::EngineStreamOptions;
use crate::stream::EventStream;
use crate::types::{CallOptions, GenerateResult, ObjectGenerationMode, StreamResult};

/// Call protocol version implemented by [`LanguageModel`]
pub const SPECIFICATION_VERSION: &str = "v1";

/// Generic language model protocol
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Protocol version
    fn specification_version(&self) -> &'static str {
        SPECIFICATION_VERSION
    }

    /// Provider name
    fn provider(&self) -> &str;

    /// Model identifier
    fn model_id(&self) -> &str;

    /// How objects are generated when the caller does not say
    fn default_object_generation_mode(&self) -> Option<ObjectGenerationMode> {
        Some(ObjectGenerationMode::Json)
    }

    /// Whether image URLs can be passed without downloading them first
    fn supports_image_urls(&self) -> bool {
        false
    }

    /// Whether JSON schemas are enforced by the model
    fn supports_structured_outputs(&self) -> bool {
        false
    }

    /// Run a non-streaming completion
    async fn do_generate(&self, options: CallOptions) -> Result<GenerateResult, LlmError>;

    /// Run a streaming completion
    async fn do_stream(&self, options: CallOptions) -> Result<StreamResult, LlmError>;
}

/// Chat model served by a lazily loaded engine
#[derive(Debug)]
pub struct ChatModel {
    provider: String,
    model_id: String,
    generation: GenerationConfig,
    engine: EngineAccess,
    span: tracing::Span,
}

impl ChatModel {
    /// Builder for a model loaded by `factory`
    pub fn builder(config: EngineConfig, factory: Arc<dyn EngineFactory>) -> ChatModelBuilder {
        ChatModelBuilder {
            config,
            factory,
            provider: crate::provider::PROVIDER_NAME.to_owned(),
            progress: ProgressReporter::default(),
            span: None,
        }
    }

    /// Model with default progress reporting and logging span
    pub fn new(config: EngineConfig, factory: Arc<dyn EngineFactory>) -> Self {
        Self::builder(config, factory).build()
    }

    /// Load the engine now instead of on the first call
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EngineInitialization`] if loading fails
    pub async fn engine(&self) -> Result<Arc<dyn Engine>, LlmError> {
        self.engine.get().instrument(self.span.clone()).await
    }
}

#[async_trait]
impl LanguageModel for ChatModel {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn do_generate(&self, options: CallOptions) -> Result<GenerateResult, LlmError> {
        async {
            let built = build_request(&self.model_id, &self.generation, options)?;
            tracing::debug!(
                messages = built.request.messages.len(),
                warnings = built.warnings.len(),
                "generating"
            );

            let engine = self.engine.get().await?;
            let reply = engine.complete(&built.request).await?;

            let result = finalize(reply, built)?;
            tracing::debug!(finish_reason = ?result.finish_reason, "generation finished");
            Ok(result)
        }
        .instrument(self.span.clone())
        .await
    }

    async fn do_stream(&self, options: CallOptions) -> Result<StreamResult, LlmError> {
        async {
            let mut built = build_request(&self.model_id, &self.generation, options)?;
            built.request.stream = Some(true);
            built.request.stream_options = Some(EngineStreamOptions { include_usage: true });
            tracing::debug!(
                messages = built.request.messages.len(),
                warnings = built.warnings.len(),
                "streaming"
            );

            let engine = self.engine.get().await?;
            let chunks = engine.complete_stream(&built.request).await?;
            let (raw_call, request) = describe_request(&built.request, built.raw_prompt)?;

            Ok(StreamResult {
                stream: EventStream::with_span(chunks, self.span.clone()),
                raw_call,
                warnings: built.warnings,
                request,
            })
        }
        .instrument(self.span.clone())
        .await
    }
}

/// Configures a [`ChatModel`]
pub struct ChatModelBuilder {
    config: EngineConfig,
    factory: Arc<dyn EngineFactory>,
    provider: String,
    progress: ProgressReporter,
    span: Option<tracing::Span>,
}

impl ChatModelBuilder {
    /// Receive engine load progress
    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(&InitProgress) + Send + Sync + 'static) -> Self {
        self.progress = ProgressReporter::new(Arc::new(callback));
        self
    }

    /// Emit all logging for this model inside `span`
    #[must_use]
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Provider name reported by the model
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Finish building; the engine is not loaded until first use
    pub fn build(self) -> ChatModel {
        let EngineConfig {
            model,
            worker,
            generation,
        } = self.config;

        let span = self
            .span
            .unwrap_or_else(|| tracing::debug_span!("chat_model", model = %model));
        let engine = EngineAccess::new(self.factory, Hosting::from_worker_flag(worker), model.as_str(), self.progress);

        ChatModel {
            provider: self.provider,
            model_id: model,
            generation,
            engine,
            span,
        }
    }
}
