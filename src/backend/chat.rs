use crate::error::SafetyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One turn of a chat-formatted prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completion backend for causal guard models.
///
/// Implementations apply the served model's chat template and return only
/// the newly generated continuation, never the prompt.
#[async_trait]
pub trait ChatGenerator: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        max_new_tokens: u32,
    ) -> Result<String, SafetyError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct ChatCompletionsBackend {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl ChatCompletionsBackend {
    pub fn new(
        api_url: String,
        model: String,
        api_key: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, SafetyError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            api_url,
            model,
            api_key,
            timeout_secs,
        })
    }
}

#[async_trait]
impl ChatGenerator for ChatCompletionsBackend {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        max_new_tokens: u32,
    ) -> Result<String, SafetyError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
            max_tokens: max_new_tokens,
        };

        log::debug!("chat completion request to {} for {}", self.api_url, self.model);

        let mut req = self
            .client
            .post(&self.api_url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs));

        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
            log::debug!("Authorization header: Bearer [REDACTED]");
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(SafetyError::UpstreamCallFailure {
                code: Some(status.as_u16().to_string()),
                message: if error_body.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    error_body
                },
            });
        }

        let response_text = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| SafetyError::InvalidResponse(format!("failed to parse chat completion: {e}")))?;

        parsed
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| SafetyError::InvalidResponse("no choices in chat completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let user = ChatMessage::user("hello");
        assert_eq!(user.role, "user");
        assert_eq!(user.content, "hello");

        let assistant = ChatMessage::assistant("hi");
        assert_eq!(assistant.role, "assistant");
        assert_eq!(assistant.content, "hi");
    }

    #[test]
    fn test_request_serializes_messages_in_order() {
        let messages = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];
        let request = ChatCompletionRequest {
            model: "guard",
            messages: &messages,
            temperature: 0.0,
            max_tokens: 100,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"model\":\"guard\""));
        assert!(json.contains("\"max_tokens\":100"));
        let user_pos = json.find("\"content\":\"a\"").unwrap();
        let assistant_pos = json.find("\"content\":\"b\"").unwrap();
        assert!(user_pos < assistant_pos);
    }
}
