use serde::{Deserialize, Serialize};

/// Role that produced the text under check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgentType {
    /// Text generated by a model.
    Agent,
    /// Text supplied by a human user.
    #[default]
    User,
}

/// Optional per-call context for a safety check.
///
/// Only the guard model checker consumes this today; the other checkers
/// accept and ignore it.
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    /// Which role produced the text under check.
    pub agent_type: AgentType,

    /// The user turn that preceded an agent response. Required (non-empty)
    /// when `agent_type` is [`AgentType::Agent`].
    pub user_prompt: String,
}

impl CheckContext {
    /// Context for checking a model response together with the prompt that
    /// elicited it.
    pub fn agent_response(user_prompt: impl Into<String>) -> Self {
        Self {
            agent_type: AgentType::Agent,
            user_prompt: user_prompt.into(),
        }
    }
}
