use crate::{
    checker::SafetyChecker,
    checkers::{
        CloudContentSafetyChecker, ContentModerationChecker, ContentModerationConfig,
        GuardModelChecker, GuardModelConfig, SensitiveTopicsChecker,
    },
    error::SafetyError,
};

/// Which checkers to instantiate. All flags default to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckerFlags {
    pub enable_cloud_content_safety: bool,
    pub enable_sensitive_topics: bool,
    pub enable_content_moderation: bool,
    pub enable_guard_model: bool,
}

/// Instantiate the checkers selected by `flags`, in a fixed order: cloud
/// content safety, sensitive topics, content moderation, guard model.
///
/// Construction is eager: every enabled checker's constructor runs here,
/// and a constructor failure (missing credentials, missing scorer
/// dependency) aborts selection.
pub fn select_checkers(flags: CheckerFlags) -> Result<Vec<Box<dyn SafetyChecker>>, SafetyError> {
    let mut checkers: Vec<Box<dyn SafetyChecker>> = Vec::new();
    if flags.enable_cloud_content_safety {
        checkers.push(Box::new(CloudContentSafetyChecker::from_env()?));
    }
    if flags.enable_sensitive_topics {
        checkers.push(Box::new(SensitiveTopicsChecker::from_env()?));
    }
    if flags.enable_content_moderation {
        checkers.push(Box::new(ContentModerationChecker::new(
            ContentModerationConfig::default(),
        )?));
    }
    if flags.enable_guard_model {
        checkers.push(Box::new(GuardModelChecker::new(GuardModelConfig::default())?));
    }
    Ok(checkers)
}
