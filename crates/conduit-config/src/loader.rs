use std::path::Path;

use crate::{Config, GenerationConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse configuration from raw TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the model is missing or a generation
    /// parameter is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.engine.model.trim().is_empty() {
            anyhow::bail!("engine.model must not be empty");
        }

        validate_generation(&self.engine.generation)
    }
}

const MAX_TOP_LOGPROBS: u32 = 20;

fn validate_generation(generation: &GenerationConfig) -> anyhow::Result<()> {
    if let Some(temperature) = generation.temperature
        && !(0.0..=2.0).contains(&temperature)
    {
        anyhow::bail!("engine.generation.temperature must be between 0 and 2, got {temperature}");
    }

    if let Some(top_p) = generation.top_p
        && !(top_p > 0.0 && top_p <= 1.0)
    {
        anyhow::bail!("engine.generation.top_p must be in (0, 1], got {top_p}");
    }

    if generation.max_tokens == Some(0) {
        anyhow::bail!("engine.generation.max_tokens must be greater than 0");
    }

    if let Some(top_logprobs) = generation.top_logprobs
        && top_logprobs > MAX_TOP_LOGPROBS
    {
        anyhow::bail!("engine.generation.top_logprobs must be at most {MAX_TOP_LOGPROBS}, got {top_logprobs}");
    }

    for (name, value) in [
        ("frequency_penalty", generation.frequency_penalty),
        ("presence_penalty", generation.presence_penalty),
    ] {
        if let Some(value) = value
            && !(-2.0..=2.0).contains(&value)
        {
            anyhow::bail!("engine.generation.{name} must be between -2 and 2, got {value}");
        }
    }

    Ok(())
}
