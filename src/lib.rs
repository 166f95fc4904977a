//! Pluggable safety checkers for LLM prompts and outputs.
//!
//! Each checker is a thin adapter over an external moderation backend
//! (a sensitive-topics scoring service, a served sequence-to-sequence
//! classifier, a cloud content-safety API, or a causal guard model),
//! normalized to a single call contract: classify a text and return a
//! [`Verdict`] of (checker name, safe flag, report).
//!
//! ```no_run
//! use llm_output_safety::{select_checkers, CheckContext, CheckerFlags, SafetyChecker};
//!
//! # async fn example() -> Result<(), llm_output_safety::SafetyError> {
//! let checkers = select_checkers(CheckerFlags {
//!     enable_guard_model: true,
//!     ..Default::default()
//! })?;
//!
//! let ctx = CheckContext::default();
//! for checker in &checkers {
//!     let verdict = checker.check("some model output", &ctx).await?;
//!     if !verdict.is_safe {
//!         println!("{} flagged the text:\n{}", verdict.checker, verdict.report);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod checker;
pub mod checkers;
mod context;
mod error;
mod report;
mod selection;

pub use backend::{
    ChatCompletionsBackend, ChatGenerator, ChatMessage, ScoredGeneration, ScoredGenerator,
    StepScores, TextGenerationBackend, TokenScore,
};
pub use checker::{SafetyChecker, Verdict};
pub use checkers::{
    CloudContentSafetyChecker, CloudContentSafetyConfig, ContentModerationChecker,
    ContentModerationConfig, GuardModelChecker, GuardModelConfig, SensitiveTopicsChecker,
    SensitiveTopicsConfig, SeverityLevel, TextCategory, CONTENT_SAFETY_ENDPOINT_VAR,
    CONTENT_SAFETY_KEY_VAR, SENSITIVE_TOPICS_SCORER_URL_VAR,
};
pub use context::{AgentType, CheckContext};
pub use error::SafetyError;
pub use selection::{select_checkers, CheckerFlags};
