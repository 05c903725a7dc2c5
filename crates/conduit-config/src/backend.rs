use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// OpenAI-compatible inference server backing the bundled HTTP engine
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Base URL override (defaults to a local server)
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<SecretString>,
}
