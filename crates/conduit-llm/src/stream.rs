//! Engine chunk stream to normalized event stream
//!
//! [`ChunkTranslator`] is the synchronous state machine; [`EventStream`]
//! drives it from an upstream [`ChunkStream`] and exposes a pull-based
//! stream with explicit cancellation.

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures_util::{Stream, StreamExt};

use crate::convert::{map_finish_reason, map_logprobs, map_usage};
use crate::engine::ChunkStream;
use crate::error::LlmError;
use crate::protocol::engine::EngineChunk;
use crate::types::{FinishReason, LogProb, ResponseMetadata, StreamEvent, Usage};

/// Translator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatorState {
    /// No chunk seen yet
    AwaitingFirstChunk,
    /// Metadata emitted, deltas flowing
    Streaming,
    /// `Finish` emitted
    Finished,
    /// `Error` emitted
    Errored,
    /// Consumer cancelled before the end
    Cancelled,
}

impl TranslatorState {
    /// Terminal states absorb all further input
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Errored | Self::Cancelled)
    }
}

/// Turns engine chunks into normalized events
#[derive(Debug)]
pub struct ChunkTranslator {
    state: TranslatorState,
    finish_reason: FinishReason,
    usage: Usage,
    logprobs: Option<Vec<LogProb>>,
}

impl Default for ChunkTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkTranslator {
    /// Fresh translator awaiting its first chunk
    pub const fn new() -> Self {
        Self {
            state: TranslatorState::AwaitingFirstChunk,
            finish_reason: FinishReason::Unknown,
            usage: Usage::unknown(),
            logprobs: None,
        }
    }

    /// Current state
    pub const fn state(&self) -> TranslatorState {
        self.state
    }

    /// Translate one chunk, in arrival order
    pub fn push_chunk(&mut self, chunk: EngineChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        match self.state {
            TranslatorState::AwaitingFirstChunk => {
                events.push(StreamEvent::ResponseMetadata(ResponseMetadata::new(
                    chunk.id,
                    chunk.model,
                    chunk.created,
                )));
                self.state = TranslatorState::Streaming;
            }
            TranslatorState::Streaming => {}
            TranslatorState::Finished | TranslatorState::Errored | TranslatorState::Cancelled => return events,
        }

        for choice in chunk.choices {
            if let Some(text) = choice.delta.content.filter(|text| !text.is_empty()) {
                events.push(StreamEvent::TextDelta { text });
            }

            for call in choice.delta.tool_calls.into_iter().flatten() {
                let function = call.function.unwrap_or_default();
                events.push(StreamEvent::ToolCallDelta {
                    tool_call_id: call.id.unwrap_or_default(),
                    tool_name: function.name.unwrap_or_default(),
                    args_text_delta: function.arguments.unwrap_or_default(),
                });
            }

            if choice.finish_reason.is_some() {
                self.finish_reason = map_finish_reason(choice.finish_reason.as_deref());
            }

            if let Some(entries) = map_logprobs(choice.logprobs.as_ref()) {
                self.logprobs.get_or_insert_with(Vec::new).extend(entries);
            }
        }

        if let Some(usage) = chunk.usage.as_ref() {
            self.usage = map_usage(Some(usage));
        }

        events
    }

    /// Upstream is exhausted; emit the single `Finish`
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.state.is_terminal() {
            return None;
        }
        self.state = TranslatorState::Finished;

        Some(StreamEvent::Finish {
            finish_reason: self.finish_reason,
            usage: self.usage,
            logprobs: self.logprobs.take(),
        })
    }

    /// Upstream failed; emit the single terminal `Error`
    pub fn fail(&mut self, cause: LlmError) -> Option<StreamEvent> {
        if self.state.is_terminal() {
            return None;
        }
        self.state = TranslatorState::Errored;

        Some(StreamEvent::Error { cause })
    }

    /// Consumer stopped reading; nothing more is emitted
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = TranslatorState::Cancelled;
        }
    }
}

/// Pull-based stream of normalized events
///
/// Ends after `Finish` or `Error`. Dropping or [cancelling](Self::cancel)
/// the stream releases the upstream chunk stream.
///
/// `ResponseMetadata` comes from the first chunk, so a stream that fails or
/// ends before any chunk arrives yields only its `Error` or `Finish`.
pub struct EventStream {
    upstream: Option<ChunkStream>,
    translator: ChunkTranslator,
    pending: VecDeque<StreamEvent>,
    span: tracing::Span,
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("state", &self.translator.state())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl EventStream {
    /// Translate the given chunk stream
    pub fn new(upstream: ChunkStream) -> Self {
        Self::with_span(upstream, tracing::Span::current())
    }

    /// Translate the given chunk stream, logging inside `span`
    pub fn with_span(upstream: ChunkStream, span: tracing::Span) -> Self {
        Self {
            upstream: Some(upstream),
            translator: ChunkTranslator::new(),
            pending: VecDeque::new(),
            span,
        }
    }

    /// Read the next event, `None` once the stream is closed
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.next().await
    }

    /// Stop reading and release the upstream
    ///
    /// Buffered events are discarded and no `Finish` is synthesized.
    pub fn cancel(&mut self) {
        let _guard = self.span.enter();

        if self.upstream.take().is_some() {
            tracing::debug!("stream cancelled by consumer");
        }
        self.pending.clear();
        self.translator.cancel();
    }

    /// Translator state
    pub const fn state(&self) -> TranslatorState {
        self.translator.state()
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let _guard = this.span.enter();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            let Some(upstream) = this.upstream.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(upstream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    let events = this.translator.push_chunk(chunk);
                    tracing::trace!(events = events.len(), "translated chunk");
                    this.pending.extend(events);
                }
                Some(Err(cause)) => {
                    tracing::warn!(error = %cause, "engine stream failed");
                    this.upstream = None;
                    this.pending.extend(this.translator.fail(cause));
                }
                None => {
                    this.upstream = None;
                    if let Some(event) = this.translator.finish() {
                        tracing::debug!("engine stream finished");
                        this.pending.push_back(event);
                    }
                }
            }
        }
    }
}
