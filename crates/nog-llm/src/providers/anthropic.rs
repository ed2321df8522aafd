//! Anthropic Messages API provider
//!
//! See: https://docs.anthropic.com/en/api/messages

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message, Result,
    Role, StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_ANTHROPIC_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Reads `ANTHROPIC_API_KEY`, and `ANTHROPIC_API_BASE` when set
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            LLMError::ConfigurationError("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;

        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("ANTHROPIC_API_BASE") {
            config.api_base = base;
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicProvider {
    pub fn with_config(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(AnthropicConfig::new(api_key))
    }

    pub fn from_env() -> Result<Self> {
        Self::with_config(AnthropicConfig::from_env()?)
    }
}

/// Anthropic takes instructions in a top-level `system` field, so system
/// messages are pulled out of the conversation and appended to it
fn split_system(system: Option<String>, messages: Vec<Message>) -> (Option<String>, Vec<Message>) {
    let (instructions, conversation): (Vec<Message>, Vec<Message>) =
        messages.into_iter().partition(|m| m.role == Role::System);

    let parts: Vec<String> = system
        .into_iter()
        .chain(instructions.into_iter().map(|m| m.content))
        .collect();
    let system = (!parts.is_empty()).then(|| parts.join("\n\n"));

    (system, conversation)
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl From<CompletionRequest> for MessagesRequest {
    fn from(request: CompletionRequest) -> Self {
        let (system, messages) = split_system(request.system, request.messages);
        Self {
            model: request.model,
            messages,
            system,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: TokenUsage,
}

impl From<MessagesResponse> for CompletionResponse {
    fn from(response: MessagesResponse) -> Self {
        Self {
            message: Message::from_blocks(response.content),
            stop_reason: response
                .stop_reason
                .as_deref()
                .map_or(StopReason::EndTurn, StopReason::from_provider),
            usage: response.usage,
        }
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = MessagesRequest::from(request);

        let response = self
            .client
            .post(format!("{}/messages", self.config.api_base))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(LLMError::from_status(status, text, &body.model));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;
        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Anthropic completion finished"
        );

        Ok(parsed.into())
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = AnthropicProvider::new("test-key").unwrap();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.config.api_base, DEFAULT_ANTHROPIC_API_BASE);
    }

    #[test]
    fn test_system_messages_are_lifted() {
        let (system, messages) = split_system(
            Some("You are a financial analyst.".to_string()),
            vec![
                Message::system("Answer briefly."),
                Message::user("How did NOG trade?"),
            ],
        );

        assert_eq!(
            system.as_deref(),
            Some("You are a financial analyst.\n\nAnswer briefly.")
        );
        assert_eq!(messages, vec![Message::user("How did NOG trade?")]);
    }

    #[test]
    fn test_no_system_stays_none() {
        let (system, messages) = split_system(None, vec![Message::user("Hi")]);
        assert!(system.is_none());
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_response_conversion() {
        let body = r#"{
            "content": [{"type": "text", "text": "Oil rallied."}],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 12, "output_tokens": 4}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        let response = CompletionResponse::from(parsed);

        assert_eq!(response.message.text(), "Oil rallied.");
        assert_eq!(response.stop_reason, StopReason::MaxTokens);
        assert_eq!(response.usage.total(), 16);
    }
}
