use crate::{context::CheckContext, error::SafetyError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a single safety check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Human-readable checker label.
    pub checker: String,

    /// True when the backend classified the text as safe.
    pub is_safe: bool,

    /// Diagnostic report. Empty on a safe verdict for every checker except
    /// the guard model, which always carries the model's full continuation.
    pub report: String,
}

impl Verdict {
    /// A safe verdict with an empty report.
    pub fn safe(checker: &str) -> Self {
        Self {
            checker: checker.to_string(),
            is_safe: true,
            report: String::new(),
        }
    }

    /// An unsafe verdict carrying a diagnostic report.
    pub fn flagged(checker: &str, report: impl Into<String>) -> Self {
        Self {
            checker: checker.to_string(),
            is_safe: false,
            report: report.into(),
        }
    }
}

/// Common call contract implemented by every checker adapter.
///
/// A checker instance is safe to call repeatedly with different texts; no
/// call mutates state observable by subsequent calls on the same or other
/// instances.
#[async_trait]
pub trait SafetyChecker: Send + Sync {
    /// Classify `text` and produce a verdict.
    async fn check(&self, text: &str, ctx: &CheckContext) -> Result<Verdict, SafetyError>;

    /// Checker label used in verdicts and logging.
    fn name(&self) -> &str;
}
