//! Provider used when no model is configured.

use crate::llm::ProviderError;

#[derive(Debug, Clone)]
pub struct OfflineProvider;

impl OfflineProvider {
    pub fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
        Err(ProviderError::Unavailable("no LLM provider configured".into()))
    }
}
