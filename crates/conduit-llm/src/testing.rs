//! Scripted engine for unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::engine::{ChunkStream, Engine, ProgressReporter};
use crate::error::LlmError;
use crate::protocol::engine::{EngineChunk, EngineReply, EngineRequest};

/// Engine replaying canned replies and chunks
///
/// Clones share their recorded calls.
#[derive(Clone, Default)]
pub(crate) struct ScriptedEngine {
    reply: Option<EngineReply>,
    chunks: Vec<EngineChunk>,
    stream_error: Option<String>,
    hold_open: bool,
    reload_delay: Option<Duration>,
    state: Arc<Recorded>,
}

#[derive(Default)]
struct Recorded {
    reloads: Mutex<Vec<String>>,
    requests: Mutex<Vec<EngineRequest>>,
    failing_reloads: AtomicUsize,
    stream_dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ScriptedEngine {
    pub(crate) fn with_reply(mut self, reply: serde_json::Value) -> Self {
        self.reply = Some(serde_json::from_value(reply).unwrap());
        self
    }

    pub(crate) fn with_chunks(mut self, chunks: Vec<serde_json::Value>) -> Self {
        self.chunks = chunks
            .into_iter()
            .map(|chunk| serde_json::from_value(chunk).unwrap())
            .collect();
        self
    }

    pub(crate) fn with_stream_error(mut self, message: &str) -> Self {
        self.stream_error = Some(message.to_owned());
        self
    }

    /// Never end the stream after the scripted chunks
    pub(crate) fn holding_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub(crate) fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = Some(delay);
        self
    }

    pub(crate) fn failing_reloads(self, count: usize) -> Self {
        self.state.failing_reloads.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn reloads(&self) -> Vec<String> {
        self.state.reloads.lock().unwrap().clone()
    }

    pub(crate) fn requests(&self) -> Vec<EngineRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub(crate) fn stream_dropped(&self) -> bool {
        self.state.stream_dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    async fn reload(&self, model: &str, progress: &ProgressReporter) -> Result<(), LlmError> {
        progress.report(0.0, "start");
        if let Some(delay) = self.reload_delay {
            tokio::time::sleep(delay).await;
        }
        self.state.reloads.lock().unwrap().push(model.to_owned());

        let failing = &self.state.failing_reloads;
        if failing.load(Ordering::SeqCst) > 0 {
            failing.fetch_sub(1, Ordering::SeqCst);
            return Err(LlmError::Upstream("model load failed".to_owned()));
        }

        progress.report(1.0, "done");
        Ok(())
    }

    async fn complete(&self, request: &EngineRequest) -> Result<EngineReply, LlmError> {
        self.state.requests.lock().unwrap().push(request.clone());

        self.reply
            .clone()
            .ok_or_else(|| LlmError::InvalidResponse("no scripted reply".to_owned()))
    }

    async fn complete_stream(&self, request: &EngineRequest) -> Result<ChunkStream, LlmError> {
        self.state.requests.lock().unwrap().push(request.clone());

        let mut items: Vec<Result<EngineChunk, LlmError>> = self.chunks.iter().cloned().map(Ok).collect();
        if let Some(message) = &self.stream_error {
            items.push(Err(LlmError::Stream(message.clone())));
        }

        let flag = DropFlag(Arc::clone(&self.state.stream_dropped));
        let tail: BoxStream<'static, Result<EngineChunk, LlmError>> = if self.hold_open {
            futures_util::stream::pending().boxed()
        } else {
            futures_util::stream::empty().boxed()
        };

        Ok(Box::pin(futures_util::stream::iter(items).chain(tail).map(move |item| {
            let _alive = &flag;
            item
        })))
    }
}
