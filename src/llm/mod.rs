//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete backends. Providers are shared
//! immutable capabilities: clone them freely and move clones onto worker
//! threads. Calls are blocking; the UI never makes them on its own thread.

pub mod providers;

use thiserror::Error;

pub use providers::gemini::GeminiProvider;
pub use providers::offline::OfflineProvider;
pub use providers::scripted::ScriptedProvider;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider '{0}' requires an API key (set GEMINI_API_KEY)")]
    MissingApiKey(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider returned an empty response")]
    EmptyResponse,
}

/// All available provider backends.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Gemini(GeminiProvider),
    /// No model configured: every call fails so callers use their fallbacks.
    Offline(OfflineProvider),
    Scripted(ScriptedProvider),
}

impl LlmProvider {
    /// Send `prompt` and return the model's text reply.
    pub fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        match self {
            LlmProvider::Gemini(p) => p.complete(prompt),
            LlmProvider::Offline(p) => p.complete(prompt),
            LlmProvider::Scripted(p) => p.complete(prompt),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Gemini(_) => "gemini",
            LlmProvider::Offline(_) => "offline",
            LlmProvider::Scripted(_) => "scripted",
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, LlmProvider::Offline(_))
    }
}
