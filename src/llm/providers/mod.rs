//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory called at startup.

pub mod gemini;
pub mod offline;
pub mod scripted;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct the configured provider. `api_key` comes from `GEMINI_API_KEY`,
/// never from TOML.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "offline" | "none" => Ok(LlmProvider::Offline(offline::OfflineProvider)),
        "gemini" => {
            let key = api_key.ok_or_else(|| ProviderError::MissingApiKey("gemini".into()))?;
            let g = &config.gemini;
            let p = gemini::GeminiProvider::new(
                g.api_base_url.clone(),
                g.model.clone(),
                g.temperature,
                g.timeout_seconds,
                key,
            )?;
            Ok(LlmProvider::Gemini(p))
        }
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}
