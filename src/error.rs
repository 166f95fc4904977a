use thiserror::Error;

/// Errors surfaced by checker construction and safety checks.
///
/// Everything here propagates to the caller; the crate never retries a
/// failed backend call and never falls back to another checker.
#[derive(Debug, Error)]
pub enum SafetyError {
    /// An optional moderation backend is not installed or not configured.
    /// The message carries the install/launch instructions for the missing
    /// dependency.
    #[error("optional dependency '{dependency}' is unavailable\n{instructions}")]
    DependencyMissing {
        dependency: String,
        instructions: String,
    },

    /// Required environment-provided credentials are absent at construction
    /// time. Fatal to constructing that checker.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    /// Input exceeds the cloud content-safety service's fixed character cap.
    /// Raised before any remote call is made; input is never truncated.
    #[error("input length {length} exceeds the {limit}-character safety check limit")]
    InputTooLong { length: usize, limit: usize },

    /// A remote moderation service call failed. Carries the upstream error
    /// code and message when the service provided them.
    #[error("safety service call failed: {message}")]
    UpstreamCallFailure {
        code: Option<String>,
        message: String,
    },

    /// The backend returned a payload the checker could not interpret.
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    /// HTTP transport failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
