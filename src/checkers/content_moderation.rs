use crate::{
    backend::{ScoredGeneration, ScoredGenerator, TextGenerationBackend},
    checker::{SafetyChecker, Verdict},
    context::CheckContext,
    error::SafetyError,
    report,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Checkpoint the serving endpoint is expected to host.
pub const MODEL_ID: &str = "Salesforce/safety-flan-t5-base";

const CHECKER_NAME: &str = "Salesforce Content Safety Flan T5 Base";
const PROMPT_PREFIX: &str = "Is the <Text> field safe or unsafe?";
const MAX_PROMPT_TOKENS: usize = 512;
const MAX_NEW_TOKENS: u32 = 20;

/// Harm categories decoded from the classifier's generation scores, paired
/// with the decoding step each category's true/false logits appear at.
const CATEGORIES: [&str; 8] = [
    "toxicity", "hate", "identity", "violence", "physical", "sexual", "profanity", "biased",
];

fn default_api_url() -> String {
    "http://localhost:8080/generate".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Configuration for the local content-moderation classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentModerationConfig {
    /// Generate endpoint of the serving layer hosting [`MODEL_ID`].
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ContentModerationConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Checker backed by a served sequence-to-sequence safety classifier.
pub struct ContentModerationChecker {
    backend: Box<dyn ScoredGenerator>,
}

impl ContentModerationChecker {
    pub fn new(config: ContentModerationConfig) -> Result<Self, SafetyError> {
        log::debug!("content moderation model {MODEL_ID} served at {}", config.api_url);
        let backend = TextGenerationBackend::new(config.api_url, config.timeout_secs)?;
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    /// Use a custom generation backend, e.g. an alternative serving stack.
    pub fn with_backend(backend: Box<dyn ScoredGenerator>) -> Self {
        Self { backend }
    }
}

fn verdict_from_generation(generation: &ScoredGeneration) -> Result<Verdict, SafetyError> {
    let first_token = generation.text.split(' ').next().unwrap_or("");
    if first_token == "safe" {
        return Ok(Verdict::safe(CHECKER_NAME));
    }

    let mut names = Vec::with_capacity(CATEGORIES.len());
    let mut values = Vec::with_capacity(CATEGORIES.len());
    for (category, step) in CATEGORIES.iter().zip((3..20).step_by(2)) {
        let scores = generation.steps.get(step).ok_or_else(|| {
            SafetyError::InvalidResponse(format!("missing generation scores for step {step}"))
        })?;
        let true_logprob = scores.logprob_of("true").ok_or_else(|| {
            SafetyError::InvalidResponse(format!("no score for token 'true' at step {step}"))
        })?;
        let false_logprob = scores.logprob_of("false").ok_or_else(|| {
            SafetyError::InvalidResponse(format!("no score for token 'false' at step {step}"))
        })?;

        let probability = report::round5(two_way_softmax(true_logprob, false_logprob));
        names.push(*category);
        values.push(report::format_score(probability));
    }

    Ok(Verdict::flagged(
        CHECKER_NAME,
        report::two_row_table(&names, &values),
    ))
}

/// Softmax over exactly two scores, returning the mass on the first.
fn two_way_softmax(preferred: f64, other: f64) -> f64 {
    1.0 / (1.0 + (other - preferred).exp())
}

#[async_trait]
impl SafetyChecker for ContentModerationChecker {
    async fn check(&self, text: &str, _ctx: &CheckContext) -> Result<Verdict, SafetyError> {
        let prompt = format!("{PROMPT_PREFIX} <Text> {text} <Context> ");
        let generation = self.backend.generate(&prompt, MAX_NEW_TOKENS).await?;

        if generation.prompt_tokens > MAX_PROMPT_TOKENS {
            log::warn!(
                "input length is > {MAX_PROMPT_TOKENS} tokens, safety check result could be incorrect"
            );
        }

        verdict_from_generation(&generation)
    }

    fn name(&self) -> &str {
        CHECKER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{StepScores, TokenScore};

    fn step(true_logprob: f64, false_logprob: f64) -> StepScores {
        StepScores {
            top_tokens: vec![
                TokenScore {
                    token: "true".to_string(),
                    logprob: true_logprob,
                },
                TokenScore {
                    token: "false".to_string(),
                    logprob: false_logprob,
                },
            ],
        }
    }

    fn generation(text: &str, steps: usize) -> ScoredGeneration {
        ScoredGeneration {
            text: text.to_string(),
            steps: (0..steps).map(|_| step(-0.1, -2.4)).collect(),
            prompt_tokens: 40,
        }
    }

    #[test]
    fn test_first_token_safe_short_circuits_scoring() {
        // no steps at all: a safe verdict must not touch the scores
        let verdict = verdict_from_generation(&generation("safe but with trailing text", 0)).unwrap();
        assert!(verdict.is_safe);
        assert_eq!(verdict.report, "");
    }

    #[test]
    fn test_unsafe_report_has_eight_categories() {
        let verdict = verdict_from_generation(&generation("unsafe toxicity", 20)).unwrap();
        assert!(!verdict.is_safe);
        let lines: Vec<&str> = verdict.report.lines().collect();
        assert_eq!(lines.len(), 2);
        // 8 cells bounded by pipes -> 10 split pieces per row
        assert_eq!(lines[0].split('|').count(), 10);
        for category in CATEGORIES {
            assert!(lines[0].contains(category));
        }
    }

    #[test]
    fn test_unsafe_probability_is_two_way_softmax_on_true() {
        let mut generation = generation("unsafe toxicity", 20);
        // equal logprobs at step 3 -> toxicity probability 0.5
        generation.steps[3] = step(-1.0, -1.0);
        let verdict = verdict_from_generation(&generation).unwrap();
        let data_row = verdict.report.lines().nth(1).unwrap();
        let first_cell = data_row.split('|').nth(1).unwrap().trim();
        assert_eq!(first_cell, "0.5");
    }

    #[test]
    fn test_missing_step_is_invalid_response() {
        let result = verdict_from_generation(&generation("unsafe", 4));
        assert!(matches!(result, Err(SafetyError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_true_false_scores_is_invalid_response() {
        let mut generation = generation("unsafe", 20);
        generation.steps[5] = StepScores::default();
        let result = verdict_from_generation(&generation);
        assert!(matches!(result, Err(SafetyError::InvalidResponse(_))));
    }

    #[test]
    fn test_two_way_softmax() {
        assert!((two_way_softmax(0.0, 0.0) - 0.5).abs() < 1e-12);
        assert!(two_way_softmax(0.0, -10.0) > 0.9999);
        assert!(two_way_softmax(-10.0, 0.0) < 0.0001);
    }
}
