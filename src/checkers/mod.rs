pub mod cloud_safety;
pub mod content_moderation;
pub mod guard_model;
pub mod sensitive_topics;

pub use cloud_safety::{
    CloudContentSafetyChecker, CloudContentSafetyConfig, SeverityLevel, TextCategory,
    CONTENT_SAFETY_ENDPOINT_VAR, CONTENT_SAFETY_KEY_VAR,
};
pub use content_moderation::{ContentModerationChecker, ContentModerationConfig};
pub use guard_model::{GuardModelChecker, GuardModelConfig};
pub use sensitive_topics::{
    SensitiveTopicsChecker, SensitiveTopicsConfig, SENSITIVE_TOPICS_SCORER_URL_VAR,
};
