//! Gemini HTTP backend

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{AssistantBackend, AssistantError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend that calls a Gemini-style generateContent endpoint
pub struct GeminiBackend {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GeminiBackend {
    pub fn new(url: String, api_key: String) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AssistantError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl AssistantBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AssistantError::MalformedResponse("response carried no text parts".to_string())
            })?;

        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
