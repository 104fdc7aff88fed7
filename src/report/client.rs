use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompt::ChatMessage;
use super::ReportError;
use crate::config::LlmConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat-completion backend: messages in, assistant text out.
#[async_trait]
pub trait ChatCompletionClient: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ReportError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints (Nebius AI Studio by default).
pub struct OpenAiCompatibleClient {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(config: LlmConfig) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReportError::HttpClient(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatCompletionClient for OpenAiCompatibleClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ReportError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ReportError::MissingApiKey)?;
        let base_url = self.config.base_url.trim_end_matches('/');
        let url = format!("{base_url}/chat/completions");
        let body = ChatCompletionRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            top_k: self.config.top_k,
            messages,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ReportError::Connection(base_url.to_string())
                } else if e.is_timeout() {
                    ReportError::Timeout(self.config.timeout.as_secs())
                } else {
                    ReportError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::ModelError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ReportError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ReportError::MalformedResponse("no choices[0].message.content".into())
            })
    }
}

/// Test double: returns a fixed completion, or fails, and records the prompts it saw.
#[cfg(test)]
pub struct MockChatClient {
    response: Option<String>,
    pub seen: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
}

#[cfg(test)]
impl MockChatClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Some(response.to_string()),
            seen: Default::default(),
        }
    }

    /// Every call fails with a connection error.
    pub fn unavailable() -> Self {
        Self {
            response: None,
            seen: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ChatCompletionClient for MockChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ReportError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        self.response
            .clone()
            .ok_or_else(|| ReportError::Connection("mock".into()))
    }
}
