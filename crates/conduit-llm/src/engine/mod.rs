//! Completion engine capability and lazy, shared access to it

mod http;
mod worker;

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::OnceCell;

pub use self::http::{HttpEngine, HttpEngineFactory};
pub use self::worker::WorkerEngine;
use crate::error::LlmError;
use crate::protocol::engine::{EngineChunk, EngineReply, EngineRequest};

/// Engine chunks in emission order
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<EngineChunk, LlmError>> + Send>>;

/// Model load progress report
#[derive(Debug, Clone, PartialEq)]
pub struct InitProgress {
    /// Fraction complete, 0.0 to 1.0
    pub progress: f64,
    /// Human-readable status
    pub text: String,
}

/// Callback receiving load progress
pub type ProgressCallback = Arc<dyn Fn(&InitProgress) + Send + Sync>;

/// Sink for load progress
///
/// Reports are logged and forwarded to the optional callback. They never
/// affect control flow.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl ProgressReporter {
    /// Reporter forwarding to `callback`
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Report progress
    pub fn report(&self, progress: f64, text: impl Into<String>) {
        let report = InitProgress {
            progress,
            text: text.into(),
        };
        tracing::debug!(progress = report.progress, text = %report.text, "engine load progress");

        if let Some(callback) = &self.callback {
            callback(&report);
        }
    }
}

/// Backend completion engine
#[async_trait]
pub trait Engine: Send + Sync {
    /// Load (or reload) the given model
    async fn reload(&self, model: &str, progress: &ProgressReporter) -> Result<(), LlmError>;

    /// Run one non-streaming completion
    async fn complete(&self, request: &EngineRequest) -> Result<EngineReply, LlmError>;

    /// Start a streaming completion
    async fn complete_stream(&self, request: &EngineRequest) -> Result<ChunkStream, LlmError>;
}

/// Constructs unloaded engines
pub trait EngineFactory: Send + Sync {
    /// Create a new engine instance
    fn create(&self) -> Result<Arc<dyn Engine>, LlmError>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Result<Arc<dyn Engine>, LlmError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn Engine>, LlmError> {
        self()
    }
}

/// Where the engine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hosting {
    /// On the caller's runtime
    #[default]
    InProcess,
    /// On a dedicated worker thread
    Worker,
}

impl Hosting {
    /// Hosting selected by the `worker` configuration flag
    pub const fn from_worker_flag(worker: bool) -> Self {
        if worker { Self::Worker } else { Self::InProcess }
    }
}

/// Lazily constructed, shared engine handle
///
/// The first caller builds and loads the engine while concurrent callers
/// wait for the same attempt. A failed attempt is not cached; the next call
/// starts over.
pub struct EngineAccess {
    factory: Arc<dyn EngineFactory>,
    hosting: Hosting,
    model: String,
    progress: ProgressReporter,
    cell: OnceCell<Arc<dyn Engine>>,
}

impl fmt::Debug for EngineAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineAccess")
            .field("hosting", &self.hosting)
            .field("model", &self.model)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl EngineAccess {
    /// Access for `model`, built by `factory`
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        hosting: Hosting,
        model: impl Into<String>,
        progress: ProgressReporter,
    ) -> Self {
        Self {
            factory,
            hosting,
            model: model.into(),
            progress,
            cell: OnceCell::new(),
        }
    }

    /// The engine, constructing and loading it on first use
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EngineInitialization`] if construction or loading
    /// fails
    pub async fn get(&self) -> Result<Arc<dyn Engine>, LlmError> {
        self.cell.get_or_try_init(|| self.initialize()).await.cloned()
    }

    /// Whether an engine is ready
    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// Selected hosting
    pub const fn hosting(&self) -> Hosting {
        self.hosting
    }

    async fn initialize(&self) -> Result<Arc<dyn Engine>, LlmError> {
        tracing::debug!(model = %self.model, hosting = ?self.hosting, "loading engine");

        let engine = self.factory.create().map_err(LlmError::into_initialization)?;
        let engine = match self.hosting {
            Hosting::InProcess => engine,
            Hosting::Worker => Arc::new(WorkerEngine::spawn(engine).map_err(LlmError::into_initialization)?),
        };

        if let Err(e) = engine.reload(&self.model, &self.progress).await {
            tracing::warn!(model = %self.model, error = %e, "engine load failed");
            return Err(e.into_initialization());
        }

        tracing::debug!(model = %self.model, "engine loaded");
        Ok(engine)
    }
}
