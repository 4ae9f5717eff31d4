//! HTTP move provider: one synchronous OpenRouter chat-completion request
//! per turn, low sampling temperature to bias toward determinism.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::provider::{truncate_chars, MoveProvider};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const TEMPERATURE: f64 = 0.3;
const ERROR_BODY_LIMIT: usize = 500;

/// OpenRouter-backed provider for one model.
pub struct OpenRouterProvider {
    model: String,
    client: reqwest::Client,
}

impl OpenRouterProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MoveProvider for OpenRouterProvider {
    async fn request_move(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ProviderError::Failure("OPENROUTER_API_KEY is not set".into()))?;

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": TEMPERATURE,
        });

        let response = self
            .client
            .post(OPENROUTER_BASE_URL)
            .bearer_auth(api_key)
            .header("HTTP-Referer", "https://llm-chess-arena.local")
            .header("X-Title", "LLM Chess Arena")
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Failure(format!(
                "openrouter HTTP {status}: {}",
                truncate_chars(&body, ERROR_BODY_LIMIT)
            )));
        }

        let data: Value = response.json().await.map_err(map_transport_error)?;

        // 2xx responses can still carry an embedded error payload.
        if let Some(error) = data.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(ProviderError::Failure(format!("openrouter error: {message}")));
        }

        let choice = data
            .get("choices")
            .and_then(|choices| choices.get(0))
            .ok_or_else(|| ProviderError::Failure("openrouter returned no choices".into()))?;

        // Missing content is not an error here; the empty string simply
        // fails extraction downstream.
        Ok(choice
            .pointer("/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

fn map_transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Failure(error.to_string())
    }
}
