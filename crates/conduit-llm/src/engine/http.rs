//! Engine backed by an OpenAI-compatible inference server

use std::sync::Arc;

use async_trait::async_trait;
use conduit_config::BackendConfig;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use super::{ChunkStream, Engine, EngineFactory, ProgressReporter};
use crate::error::{LlmError, classify};
use crate::protocol::engine::{EngineChunk, EngineModelList, EngineReply, EngineRequest, EngineStreamOptions};

/// Local inference server address used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/v1";

/// Sentinel closing an SSE completion stream
const DONE_SENTINEL: &str = "[DONE]";

/// HTTP client for an OpenAI-compatible chat completion server
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl HttpEngine {
    /// Create from backend configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the default base URL cannot be parsed
    pub fn new(config: &BackendConfig) -> Result<Self, LlmError> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => Url::parse(DEFAULT_BASE_URL).map_err(|e| LlmError::Internal(e.into()))?,
        };

        Ok(Self {
            client: Client::new(),
            base_url,
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.expose_secret().is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/{path}")
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, LlmError> {
        let response = self.authorized(builder).send().await.map_err(|e| {
            tracing::error!(base_url = %self.base_url, error = %e, "engine request failed");
            LlmError::Upstream(e.to_string())
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Turn a non-success response into an error, preferring the server's own
/// structured message
async fn error_from_response(response: Response) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = %status, "engine returned error");

    match classify(&body) {
        Ok(backend) => LlmError::Backend(backend),
        Err(_) => LlmError::Upstream(format!("engine returned {status}: {body}")),
    }
}

#[async_trait]
impl Engine for HttpEngine {
    async fn reload(&self, model: &str, progress: &ProgressReporter) -> Result<(), LlmError> {
        progress.report(0.0, format!("Connecting to {}", self.base_url));

        let response = self.send(self.client.get(self.endpoint("models"))).await?;
        let models: EngineModelList = response.json().await.map_err(|e| LlmError::ResponseParse {
            message: format!("failed to parse model list: {e}"),
        })?;

        if !models.data.iter().any(|m| m.id == model) {
            return Err(LlmError::EngineInitialization(format!(
                "model `{model}` is not available on {}",
                self.base_url
            )));
        }

        progress.report(1.0, format!("Model {model} ready"));
        Ok(())
    }

    async fn complete(&self, request: &EngineRequest) -> Result<EngineReply, LlmError> {
        let builder = self.client.post(self.endpoint("chat/completions")).json(request);
        let response = self.send(builder).await?;

        response.json().await.map_err(|e| LlmError::ResponseParse {
            message: format!("failed to parse completion: {e}"),
        })
    }

    async fn complete_stream(&self, request: &EngineRequest) -> Result<ChunkStream, LlmError> {
        let mut request = request.clone();
        request.stream = Some(true);
        request.stream_options = Some(EngineStreamOptions { include_usage: true });

        let builder = self.client.post(self.endpoint("chat/completions")).json(&request);
        let response = self.send(builder).await?;

        let chunks = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => parse_event(event.data.trim()),
                    Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
                }
            });

        Ok(Box::pin(chunks))
    }
}

/// Interpret one SSE data payload
///
/// Error bodies sent in-band become [`LlmError::Backend`] and payloads that
/// do not decode as chunks become [`LlmError::ResponseParse`]. Returns
/// `None` only for empty payloads and the done sentinel.
fn parse_event(data: &str) -> Option<Result<EngineChunk, LlmError>> {
    if data.is_empty() || data == DONE_SENTINEL {
        return None;
    }

    if let Ok(backend) = classify(data) {
        return Some(Err(LlmError::Backend(backend)));
    }

    let parsed = serde_json::from_str::<EngineChunk>(data).map_err(|e| {
        tracing::warn!(error = %e, "undecodable stream chunk");
        LlmError::ResponseParse {
            message: format!("failed to parse stream chunk: {e}"),
        }
    });

    Some(parsed)
}

/// Builds [`HttpEngine`]s from backend configuration
#[derive(Debug, Clone, Default)]
pub struct HttpEngineFactory {
    config: BackendConfig,
}

impl HttpEngineFactory {
    /// Factory for the given backend
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for HttpEngineFactory {
    fn create(&self) -> Result<Arc<dyn Engine>, LlmError> {
        Ok(Arc::new(HttpEngine::new(&self.config)?))
    }
}
