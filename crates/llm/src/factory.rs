//! LLM provider factory.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::types::ProviderType;
use docqa_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout` - Per-request timeout
///
/// # Errors
/// Returns `AppError::Llm` if the provider is unknown or the HTTP client
/// cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Llm(format!("Unknown provider: {}", provider)))?;

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(provider_type.default_endpoint());
            let client = OllamaClient::with_timeout(base_url, timeout)?;
            Ok(Arc::new(client))
        }
    }
}
