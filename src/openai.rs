//! OpenAI client configuration with sensible defaults.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for model API requests (2 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with configured timeout.
///
/// An `api_base` override allows OpenAI-compatible services (Groq, local
/// inference servers) to be used with the same client.
pub fn create_client(api_base: Option<&str>) -> Client<OpenAIConfig> {
    create_client_with_timeout(api_base, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(
    api_base: Option<&str>,
    timeout: Duration,
) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client");

    let config = match api_base {
        Some(base) => OpenAIConfig::default().with_api_base(base),
        None => OpenAIConfig::default(),
    };

    Client::with_config(config).with_http_client(http_client)
}
