//! HTTP-served model backends the checkers delegate to.
//!
//! The serving layer owns model loading, tokenization, chat templates, and
//! the generation procedure; the traits here expose only the narrow calls
//! the checkers need, and double as the seam test stubs plug into.

pub mod chat;
pub mod scored;

pub use chat::{ChatCompletionsBackend, ChatGenerator, ChatMessage};
pub use scored::{ScoredGeneration, ScoredGenerator, StepScores, TextGenerationBackend, TokenScore};
