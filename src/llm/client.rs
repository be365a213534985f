//! Groq chat-completions client backing the [`LanguageModel`] trait.
//!
//! Blocking on purpose: pipeline runs are fully sequential and have nothing
//! to do while the completion is in flight.

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{FormFillError, Result};
use crate::pipeline::LanguageModel;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

pub struct GroqClient {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

impl GroqClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            base_url: GROQ_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageBody,
}

#[derive(Deserialize)]
struct MessageBody {
    content: String,
}

impl LanguageModel for GroqClient {
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        debug!("POST {} (model {})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .map_err(|e| FormFillError::LlmRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FormFillError::LlmRequest(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| FormFillError::LlmRequest(format!("invalid response body: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| FormFillError::LlmRequest("empty choices list".to_string()))
    }
}
