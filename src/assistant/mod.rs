//! Dashboard assistant
//!
//! A small Q&A helper backed by a hosted LLM. The backend sits behind a
//! trait so tests swap in a mock, and every backend failure falls back
//! to canned guidance so the endpoint never errors out.

pub mod gemini;
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub use gemini::GeminiBackend;
pub use mock::MockBackend;

/// Errors a backend can surface
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("http error: {0}")]
    Http(String),

    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("no backend configured")]
    NotConfigured,
}

/// Text-generation backend
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Generate a reply for the prompt
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;

    /// Short backend identifier for logs and responses
    fn name(&self) -> &'static str;
}

/// Reply returned to the caller, with where it came from
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AssistantReply {
    pub answer: String,
    /// Backend name, or "canned" when the fallback answered
    pub source: String,
}

/// Backend wrapper with the canned fallback baked in
#[derive(Clone)]
pub struct Assistant {
    backend: Option<Arc<dyn AssistantBackend>>,
}

impl Assistant {
    pub fn new(backend: Option<Arc<dyn AssistantBackend>>) -> Self {
        Self { backend }
    }

    /// Answer a question. Hits the backend when one is configured and
    /// falls back to canned guidance on any failure.
    pub async fn reply(&self, question: &str) -> AssistantReply {
        if let Some(backend) = &self.backend {
            match backend.generate(question).await {
                Ok(answer) => {
                    debug!(backend = backend.name(), "assistant reply generated");
                    return AssistantReply {
                        answer,
                        source: backend.name().to_string(),
                    };
                }
                Err(err) => {
                    warn!(backend = backend.name(), error = %err, "assistant backend failed, using canned reply");
                }
            }
        }
        AssistantReply {
            answer: canned_reply(question),
            source: "canned".to_string(),
        }
    }
}

/// Keyword-matched guidance used when no backend answers
fn canned_reply(question: &str) -> String {
    let q = question.to_lowercase();
    if q.contains("task") || q.contains("prerequisite") {
        "Check your task list on the dashboard. Tasks unlock once all of their \
         prerequisites are marked done, so finish those first."
            .to_string()
    } else if q.contains("attendance") || q.contains("check-in") || q.contains("check in") {
        "Attendance check-in works from approved office networks. If your \
         check-in is rejected, make sure you are connected to the office \
         Wi-Fi and try again."
            .to_string()
    } else if q.contains("streak") || q.contains("progress") || q.contains("metric") {
        "Your progress metrics update whenever you complete a task. Complete \
         at least one task every day to keep your streak going."
            .to_string()
    } else if q.contains("meeting") {
        "You can create or join a meeting from the Meetings tab. Entering a \
         room name gives you a shareable link."
            .to_string()
    } else {
        "I could not reach the assistant service. Try again later, or ask \
         your mentor directly in the chat."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_come_from_the_backend_when_it_works() {
        let backend = Arc::new(MockBackend::with_reply("Use the dashboard."));
        let assistant = Assistant::new(Some(backend.clone()));
        let reply = assistant.reply("how do I start?").await;
        assert_eq!(reply.answer, "Use the dashboard.");
        assert_eq!(reply.source, "mock");
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_canned() {
        let backend = Arc::new(MockBackend::failing());
        let assistant = Assistant::new(Some(backend));
        let reply = assistant.reply("why is my task locked?").await;
        assert_eq!(reply.source, "canned");
        assert!(reply.answer.contains("prerequisites"));
    }

    #[tokio::test]
    async fn no_backend_means_canned() {
        let assistant = Assistant::new(None);
        let reply = assistant.reply("attendance not working").await;
        assert_eq!(reply.source, "canned");
        assert!(reply.answer.contains("check-in"));
    }

    #[test]
    fn canned_replies_cover_common_topics() {
        assert!(canned_reply("how do streaks work?").contains("streak"));
        assert!(canned_reply("start a meeting").contains("Meetings"));
        assert!(!canned_reply("unrelated question").is_empty());
    }
}
