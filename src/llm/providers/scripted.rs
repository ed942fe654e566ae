//! Provider that replays canned replies in order.
//!
//! Used by tests and offline demos to drive the AI pipeline without network
//! access. Once the script runs out every call is `Unavailable`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::llm::ProviderError;

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    replies: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::default();
        for reply in replies {
            provider.push_reply(reply);
        }
        provider
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Ok(reply.into()));
        }
    }

    pub fn push_error(&self, err: ProviderError) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(err));
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|q| q.len()).unwrap_or(0)
    }

    pub fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        self.replies
            .lock()
            .map_err(|_| ProviderError::Unavailable("script lock poisoned".into()))?
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_exhausts() {
        let p = ScriptedProvider::new(["one", "two"]);
        p.push_error(ProviderError::Request("boom".into()));

        assert_eq!(p.complete("a").unwrap(), "one");
        assert_eq!(p.clone().complete("b").unwrap(), "two");
        assert_eq!(p.complete("c").unwrap_err(), ProviderError::Request("boom".into()));
        assert!(matches!(p.complete("d"), Err(ProviderError::Unavailable(_))));
        assert_eq!(p.prompts(), vec!["a", "b", "c", "d"]);
        assert_eq!(p.remaining(), 0);
    }
}
