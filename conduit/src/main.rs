#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::io::Write;

use args::Args;
use clap::Parser;
use conduit_config::Config;
use conduit_llm::types::{StreamEvent, Usage};
use conduit_llm::{CallOptions, ChatModel, ConduitProvider, LanguageModel};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(model) = &args.model {
        config.engine.model.clone_from(model);
    }

    // Initialize logging
    conduit_telemetry::init(config.telemetry.as_ref(), "warn")?;

    tracing::info!(
        model = %config.engine.model,
        worker = config.engine.worker,
        "starting conduit"
    );

    let model = ConduitProvider::from_config(&config)
        .language_model_builder()
        .on_progress(|report| tracing::info!(progress = report.progress, "{}", report.text))
        .build();

    let options = args.call_options()?;

    if args.stream {
        stream(&model, options).await
    } else {
        generate(&model, options).await
    }
}

async fn generate(model: &ChatModel, options: CallOptions) -> anyhow::Result<()> {
    let result = model.do_generate(options).await?;

    for warning in &result.warnings {
        tracing::warn!(?warning, "call warning");
    }

    println!("{}", result.text);
    for call in &result.tool_calls {
        println!("tool call {} {}({})", call.tool_call_id, call.tool_name, call.args);
    }
    eprintln!("[{:?}] {}", result.finish_reason, usage_summary(result.usage));

    Ok(())
}

async fn stream(model: &ChatModel, options: CallOptions) -> anyhow::Result<()> {
    let mut result = model.do_stream(options).await?;

    for warning in &result.warnings {
        tracing::warn!(?warning, "call warning");
    }

    // Ctrl-C cancels the in-flight stream
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let mut stdout = std::io::stdout();

    loop {
        let next = tokio::select! {
            event = result.stream.next_event() => Some(event),
            () = cancel.cancelled() => None,
        };

        let Some(next) = next else {
            result.stream.cancel();
            eprintln!("\n[cancelled]");
            return Ok(());
        };

        let Some(event) = next else {
            return Ok(());
        };

        match event {
            StreamEvent::ResponseMetadata(metadata) => {
                tracing::debug!(id = %metadata.id, model = %metadata.model_id, "stream started");
            }
            StreamEvent::TextDelta { text } => {
                write!(stdout, "{text}")?;
                stdout.flush()?;
            }
            StreamEvent::ToolCallDelta {
                tool_call_id,
                tool_name,
                args_text_delta,
            } => {
                tracing::debug!(%tool_call_id, %tool_name, %args_text_delta, "tool call delta");
            }
            StreamEvent::Finish {
                finish_reason, usage, ..
            } => {
                writeln!(stdout)?;
                eprintln!("[{finish_reason:?}] {}", usage_summary(usage));
            }
            StreamEvent::Error { cause } => return Err(cause.into()),
        }
    }
}

fn usage_summary(usage: Usage) -> String {
    let count = |value: Option<u32>| value.map_or_else(|| "?".to_owned(), |v| v.to_string());

    format!(
        "prompt tokens: {}, completion tokens: {}",
        count(usage.prompt_tokens),
        count(usage.completion_tokens)
    )
}
