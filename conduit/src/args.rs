use std::path::PathBuf;

use clap::Parser;
use conduit_llm::CallOptions;
use conduit_llm::types::{Message, Mode};

/// Conduit chat completion client
#[derive(Debug, Parser)]
#[command(name = "conduit", about = "Run chat completions against a local inference engine")]
pub struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, env = "CONDUIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured model
    #[arg(short, long, env = "CONDUIT_MODEL")]
    pub model: Option<String>,

    /// Print text as it is generated
    #[arg(long)]
    pub stream: bool,

    /// System instructions prepended to the prompt
    #[arg(long)]
    pub system: Option<String>,

    /// Request a JSON object matching the schema in this file
    #[arg(long, value_name = "FILE")]
    pub json_schema: Option<PathBuf>,

    /// Cap on generated tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// User prompt
    pub prompt: String,
}

impl Args {
    /// Call options described by the command line
    pub fn call_options(&self) -> anyhow::Result<CallOptions> {
        let mut prompt = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            prompt.push(Message::system(system.as_str()));
        }
        prompt.push(Message::user(self.prompt.as_str()));

        let mut options = CallOptions::new(prompt);
        options.max_tokens = self.max_tokens;
        options.temperature = self.temperature;

        if let Some(path) = &self.json_schema {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read schema file {}: {e}", path.display()))?;
            let schema: serde_json::Value = serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("schema file {} is not valid JSON: {e}", path.display()))?;
            options.mode = Mode::object_json(schema);
        }

        Ok(options)
    }
}
