//! Mock backend for tests

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{AssistantBackend, AssistantError};

/// Configurable in-memory backend
pub struct MockBackend {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl MockBackend {
    /// Backend that always returns the given reply
    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Backend that fails every call
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generate calls received so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantBackend for MockBackend {
    async fn generate(&self, _prompt: &str) -> Result<String, AssistantError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(AssistantError::Http("mock backend failure".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
