mod harness;

use std::time::Duration;

use conduit_llm::stream::TranslatorState;
use conduit_llm::types::{FinishReason, Message, Usage};
use conduit_llm::{CallOptions, ConduitProvider, LanguageModel, LlmError, StreamEvent};
use futures_util::StreamExt;
use harness::config::ConfigBuilder;
use harness::mock_engine::{MOCK_MODEL, MockEngine, StreamBehavior};

fn hello() -> CallOptions {
    CallOptions::new(vec![Message::user("Hello")])
}

fn text_of(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::TextDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn stream_translates_sse_chunks() {
    let mock = MockEngine::builder().with_response("one two three").start().await.unwrap();
    let config = ConfigBuilder::new(MOCK_MODEL, &mock.base_url()).build();
    let model = ConduitProvider::from_config(&config).language_model();

    let result = model.do_stream(hello()).await.unwrap();
    let events: Vec<_> = result.stream.collect().await;

    match &events[0] {
        StreamEvent::ResponseMetadata(metadata) => {
            assert_eq!(metadata.id, "chatcmpl-test-stream");
            assert_eq!(metadata.model_id, MOCK_MODEL);
            assert_eq!(metadata.timestamp.as_second(), 1_700_000_000);
        }
        other => panic!("expected metadata first, got {other:?}"),
    }
    assert_eq!(text_of(&events), "one two three ");
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, StreamEvent::ResponseMetadata(_)))
            .count(),
        1
    );

    match events.last() {
        Some(StreamEvent::Finish {
            finish_reason, usage, ..
        }) => {
            assert_eq!(*finish_reason, FinishReason::Stop);
            assert_eq!(*usage, Usage::new(10, 5));
        }
        other => panic!("expected finish last, got {other:?}"),
    }

    let sent = &mock.requests()[0];
    assert_eq!(sent["stream"], true);
    assert_eq!(sent["stream_options"]["include_usage"], true);
}

#[tokio::test]
async fn in_band_error_terminates_stream() {
    let mock = MockEngine::builder()
        .with_stream_behavior(StreamBehavior::FailMidway)
        .start()
        .await
        .unwrap();
    let config = ConfigBuilder::new(MOCK_MODEL, &mock.base_url()).build();
    let model = ConduitProvider::from_config(&config).language_model();

    let mut result = model.do_stream(hello()).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = result.next_event().await {
        events.push(event);
    }

    assert_eq!(text_of(&events), "partial");
    assert!(!events.iter().any(|event| matches!(event, StreamEvent::Finish { .. })));
    match events.last() {
        Some(StreamEvent::Error {
            cause: LlmError::Backend(backend),
        }) => assert_eq!(backend.message, "engine ran out of memory"),
        other => panic!("expected backend error last, got {other:?}"),
    }
    assert_eq!(result.stream.state(), TranslatorState::Errored);
}

#[tokio::test]
async fn undecodable_chunk_terminates_stream() {
    let mock = MockEngine::builder()
        .with_stream_behavior(StreamBehavior::Malformed)
        .start()
        .await
        .unwrap();
    let config = ConfigBuilder::new(MOCK_MODEL, &mock.base_url()).build();
    let model = ConduitProvider::from_config(&config).language_model();

    let mut result = model.do_stream(hello()).await.unwrap();
    let mut events = Vec::new();
    while let Some(event) = result.next_event().await {
        events.push(event);
    }

    assert_eq!(text_of(&events), "partial");
    assert!(!events.iter().any(|event| matches!(event, StreamEvent::Finish { .. })));
    assert!(
        matches!(
            events.last(),
            Some(StreamEvent::Error {
                cause: LlmError::ResponseParse { .. }
            })
        ),
        "{events:?}"
    );
    assert_eq!(result.stream.state(), TranslatorState::Errored);
}

#[tokio::test]
async fn failure_before_streaming_is_returned_directly() {
    let mock = MockEngine::builder().failing(1).start().await.unwrap();
    let config = ConfigBuilder::new(MOCK_MODEL, &mock.base_url()).build();
    let model = ConduitProvider::from_config(&config).language_model();

    let err = model.do_stream(hello()).await.unwrap_err();
    assert!(matches!(err, LlmError::Backend(_)), "{err:?}");
}

#[tokio::test]
async fn worker_hosted_stream_matches_in_process() {
    let mock = MockEngine::builder().with_response("same either way").start().await.unwrap();

    let mut transcripts = Vec::new();
    for config in [
        ConfigBuilder::new(MOCK_MODEL, &mock.base_url()).build(),
        ConfigBuilder::new(MOCK_MODEL, &mock.base_url()).with_worker().build(),
    ] {
        let model = ConduitProvider::from_config(&config).language_model();
        let events: Vec<_> = model.do_stream(hello()).await.unwrap().stream.collect().await;
        transcripts.push(format!("{events:?}"));
    }

    assert_eq!(transcripts[0], transcripts[1]);
}

#[tokio::test]
async fn cancel_closes_the_engine_stream() {
    let mock = MockEngine::builder()
        .with_stream_behavior(StreamBehavior::Stall)
        .start()
        .await
        .unwrap();
    let config = ConfigBuilder::new(MOCK_MODEL, &mock.base_url()).build();
    let model = ConduitProvider::from_config(&config).language_model();

    let mut result = model.do_stream(hello()).await.unwrap();
    assert!(matches!(result.next_event().await, Some(StreamEvent::ResponseMetadata(_))));
    assert!(matches!(result.next_event().await, Some(StreamEvent::TextDelta { .. })));

    result.stream.cancel();

    assert_eq!(result.stream.state(), TranslatorState::Cancelled);
    assert!(result.next_event().await.is_none());
    assert!(mock.wait_for_stream_close(Duration::from_secs(5)).await);
}
