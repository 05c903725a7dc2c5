//! Engine hosted on a dedicated worker thread

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_util::task::TaskTracker;

use super::{ChunkStream, Engine, ProgressReporter};
use crate::error::LlmError;
use crate::protocol::engine::{EngineChunk, EngineReply, EngineRequest};

const WORKER_THREAD_NAME: &str = "conduit-engine";
const COMMAND_CAPACITY: usize = 32;
const CHUNK_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, LlmError>>;

enum Command {
    Reload {
        model: String,
        progress: ProgressReporter,
        reply: Reply<()>,
    },
    Complete {
        request: EngineRequest,
        reply: Reply<EngineReply>,
    },
    Stream {
        request: EngineRequest,
        chunks: mpsc::Sender<Forwarded>,
        reply: Reply<()>,
    },
}

enum Forwarded {
    Chunk(EngineChunk),
    Failed(LlmError),
    Done,
}

/// Proxy to an engine running on its own thread and runtime
///
/// Calls are forwarded over channels. Dropping the last proxy stops the
/// worker once every call already in flight, open streams included, has
/// completed.
#[derive(Debug, Clone)]
pub struct WorkerEngine {
    commands: mpsc::Sender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Reload { .. } => "Reload",
            Self::Complete { .. } => "Complete",
            Self::Stream { .. } => "Stream",
        };
        f.write_str(name)
    }
}

impl WorkerEngine {
    /// Move `engine` onto a new worker thread
    ///
    /// # Errors
    ///
    /// Returns an error if the worker runtime or thread cannot be created
    pub fn spawn(engine: Arc<dyn Engine>) -> Result<Self, LlmError> {
        let (commands, inbox) = mpsc::channel(COMMAND_CAPACITY);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LlmError::EngineInitialization(format!("failed to build worker runtime: {e}")))?;

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || {
                runtime.block_on(run(engine, inbox));
                tracing::debug!("engine worker stopped");
            })
            .map_err(|e| LlmError::EngineInitialization(format!("failed to spawn engine worker: {e}")))?;

        Ok(Self { commands })
    }

    async fn call<T>(&self, command: Command, reply: oneshot::Receiver<Result<T, LlmError>>) -> Result<T, LlmError> {
        self.commands.send(command).await.map_err(|_| worker_gone())?;
        reply.await.map_err(|_| worker_gone())?
    }
}

fn worker_gone() -> LlmError {
    LlmError::Internal(anyhow::anyhow!("engine worker is not running"))
}

#[async_trait]
impl Engine for WorkerEngine {
    async fn reload(&self, model: &str, progress: &ProgressReporter) -> Result<(), LlmError> {
        let (reply, rx) = oneshot::channel();
        let command = Command::Reload {
            model: model.to_owned(),
            progress: progress.clone(),
            reply,
        };

        self.call(command, rx).await
    }

    async fn complete(&self, request: &EngineRequest) -> Result<EngineReply, LlmError> {
        let (reply, rx) = oneshot::channel();
        let command = Command::Complete {
            request: request.clone(),
            reply,
        };

        self.call(command, rx).await
    }

    async fn complete_stream(&self, request: &EngineRequest) -> Result<ChunkStream, LlmError> {
        let (chunks, received) = mpsc::channel(CHUNK_CAPACITY);
        let (reply, rx) = oneshot::channel();
        let command = Command::Stream {
            request: request.clone(),
            chunks,
            reply,
        };

        self.call(command, rx).await?;

        let stream = futures_util::stream::unfold(Some(received), |received| async move {
            let mut received = received?;
            match received.recv().await {
                Some(Forwarded::Chunk(chunk)) => Some((Ok(chunk), Some(received))),
                Some(Forwarded::Failed(e)) => Some((Err(e), None)),
                Some(Forwarded::Done) => None,
                None => Some((
                    Err(LlmError::Stream(
                        "engine worker stopped before the stream completed".to_owned(),
                    )),
                    None,
                )),
            }
        });

        Ok(Box::pin(stream))
    }
}

async fn run(engine: Arc<dyn Engine>, mut inbox: mpsc::Receiver<Command>) {
    let tasks = TaskTracker::new();

    while let Some(command) = inbox.recv().await {
        tracing::trace!(?command, "engine worker received command");
        tasks.spawn(serve(Arc::clone(&engine), command));
    }

    // The runtime goes down with this future, so drain in-flight calls first
    tasks.close();
    if !tasks.is_empty() {
        tracing::debug!(in_flight = tasks.len(), "engine worker draining calls");
    }
    tasks.wait().await;
}

async fn serve(engine: Arc<dyn Engine>, command: Command) {
    match command {
        Command::Reload { model, progress, reply } => {
            let _ = reply.send(engine.reload(&model, &progress).await);
        }
        Command::Complete { request, reply } => {
            let _ = reply.send(engine.complete(&request).await);
        }
        Command::Stream { request, chunks, reply } => match engine.complete_stream(&request).await {
            Ok(stream) => {
                if reply.send(Ok(())).is_ok() {
                    forward(stream, chunks).await;
                }
            }
            Err(e) => {
                let _ = reply.send(Err(e));
            }
        },
    }
}

/// Pump engine chunks to the caller until the stream ends or the caller
/// stops listening
async fn forward(mut stream: ChunkStream, chunks: mpsc::Sender<Forwarded>) {
    loop {
        let item = tokio::select! {
            item = stream.next() => item,
            () = chunks.closed() => {
                tracing::debug!("stream consumer went away, releasing engine stream");
                return;
            }
        };

        let (message, last) = match item {
            Some(Ok(chunk)) => (Forwarded::Chunk(chunk), false),
            Some(Err(e)) => (Forwarded::Failed(e), true),
            None => (Forwarded::Done, true),
        };

        if chunks.send(message).await.is_err() || last {
            return;
        }
    }
}
