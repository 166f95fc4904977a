use crate::{
    backend::{ChatCompletionsBackend, ChatGenerator, ChatMessage},
    checker::{SafetyChecker, Verdict},
    context::{AgentType, CheckContext},
    error::SafetyError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Guard model the serving endpoint is expected to host.
pub const MODEL_ID: &str = "meta-llama/Llama-Guard-3-8B";

const CHECKER_NAME: &str = "Llama Guard";
const MAX_NEW_TOKENS: u32 = 100;
const MISSING_CONTEXT_REPORT: &str = "Missing user_prompt from Agent response check";

fn default_api_url() -> String {
    "http://localhost:8000/v1/chat/completions".to_string()
}

fn default_model() -> String {
    MODEL_ID.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Configuration for the guard model checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardModelConfig {
    /// OpenAI-compatible chat-completions endpoint serving the guard model.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional bearer key for authenticated endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GuardModelConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Checker backed by a served causal-language-model guard classifier.
pub struct GuardModelChecker {
    backend: Box<dyn ChatGenerator>,
}

impl GuardModelChecker {
    pub fn new(config: GuardModelConfig) -> Result<Self, SafetyError> {
        let backend = ChatCompletionsBackend::new(
            config.api_url,
            config.model,
            config.api_key,
            config.timeout_secs,
        )?;
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    /// Use a custom chat backend, e.g. an alternative serving stack.
    pub fn with_backend(backend: Box<dyn ChatGenerator>) -> Self {
        Self { backend }
    }
}

/// Two-turn chat for checking an agent response against its user prompt.
///
/// The user prompt is stripped out of the agent text by best-effort
/// substring removal: every verbatim occurrence is removed, and when the
/// prompt does not occur verbatim the text passes through unchanged.
fn build_agent_chat(model_prompt: &str, user_prompt: &str) -> Vec<ChatMessage> {
    let agent_text = model_prompt.replace(user_prompt, "");
    vec![
        ChatMessage::user(format!("User: {user_prompt}")),
        ChatMessage::assistant(format!("Agent: {agent_text}")),
    ]
}

fn verdict_from_continuation(continuation: &str) -> Verdict {
    let first_line = continuation.split('\n').next().unwrap_or("");
    Verdict {
        checker: CHECKER_NAME.to_string(),
        is_safe: first_line == "safe",
        report: continuation.to_string(),
    }
}

#[async_trait]
impl SafetyChecker for GuardModelChecker {
    async fn check(&self, text: &str, ctx: &CheckContext) -> Result<Verdict, SafetyError> {
        let model_prompt = text.trim();
        let chat = match ctx.agent_type {
            AgentType::Agent => {
                if ctx.user_prompt.is_empty() {
                    log::warn!("empty user prompt for agent check, returning unsafe");
                    return Ok(Verdict::flagged(CHECKER_NAME, MISSING_CONTEXT_REPORT));
                }
                build_agent_chat(model_prompt, &ctx.user_prompt)
            }
            AgentType::User => vec![ChatMessage::user(model_prompt)],
        };

        let continuation = self.backend.generate(&chat, MAX_NEW_TOKENS).await?;
        Ok(verdict_from_continuation(&continuation))
    }

    fn name(&self) -> &str {
        CHECKER_NAME
    }
}
