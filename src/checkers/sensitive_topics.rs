use crate::{
    checker::{SafetyChecker, Verdict},
    context::CheckContext,
    error::SafetyError,
    report,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};

/// Environment variable naming the scorer's `/safety_scores` endpoint.
pub const SENSITIVE_TOPICS_SCORER_URL_VAR: &str = "SENSITIVE_TOPICS_SCORER_URL";

const CHECKER_NAME: &str = "Sensitive Topics";
const SCORING_METHOD: &str = "sensitive_topics";
const SAFE_CLASS: &str = "none";

const INSTALL_INSTRUCTIONS: &str = "Could not locate the AuditNLG sensitive-topics scoring service.\n\
Please install and launch it manually with:\n\
 pip install auditnlg\n\
Followed by:\n\
pip install -r requirements.txt\n\
then point SENSITIVE_TOPICS_SCORER_URL at its safety_scores endpoint.";

fn default_timeout_secs() -> u64 {
    30
}

/// Configuration for the sensitive-topics checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveTopicsConfig {
    /// Scoring service endpoint, e.g. `http://localhost:8602/safety_scores`.
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    data: Vec<ScoreRecord<'a>>,
    method: &'a str,
}

#[derive(Debug, Serialize)]
struct ScoreRecord<'a> {
    output: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    all_scores: Vec<TopicScores>,
}

#[derive(Debug, Deserialize)]
struct TopicScores {
    pred_class: String,
    /// Ranked list of single-entry class-name → score maps.
    class_scores: Vec<BTreeMap<String, f64>>,
}

/// Checker backed by an external sensitive-topic scoring service.
pub struct SensitiveTopicsChecker {
    client: reqwest::Client,
    config: SensitiveTopicsConfig,
}

impl SensitiveTopicsChecker {
    pub fn new(config: SensitiveTopicsConfig) -> Result<Self, SafetyError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            config,
        })
    }

    /// Resolve the scorer endpoint from the environment.
    ///
    /// The scoring service is an optional dependency: if
    /// `SENSITIVE_TOPICS_SCORER_URL` is unset, install instructions are
    /// logged and construction fails with
    /// [`SafetyError::DependencyMissing`].
    pub fn from_env() -> Result<Self, SafetyError> {
        let api_url = match std::env::var(SENSITIVE_TOPICS_SCORER_URL_VAR) {
            Ok(url) => url,
            Err(_) => {
                log::error!("{INSTALL_INSTRUCTIONS}");
                return Err(SafetyError::DependencyMissing {
                    dependency: "auditnlg".to_string(),
                    instructions: INSTALL_INSTRUCTIONS.to_string(),
                });
            }
        };
        Self::new(SensitiveTopicsConfig {
            api_url,
            timeout_secs: default_timeout_secs(),
        })
    }

    async fn score(&self, text: &str) -> Result<TopicScores, SafetyError> {
        let request = ScoreRequest {
            data: vec![ScoreRecord { output: text }],
            method: SCORING_METHOD,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

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
        let parsed: ScoreResponse = serde_json::from_str(&response_text).map_err(|e| {
            SafetyError::InvalidResponse(format!("failed to parse safety scores: {e}"))
        })?;

        parsed
            .all_scores
            .into_iter()
            .next()
            .ok_or_else(|| SafetyError::InvalidResponse("empty all_scores in response".to_string()))
    }
}

fn verdict_from_scores(scores: &TopicScores) -> Verdict {
    if scores.pred_class == SAFE_CLASS {
        return Verdict::safe(CHECKER_NAME);
    }

    let mut names = Vec::with_capacity(scores.class_scores.len());
    let mut values = Vec::with_capacity(scores.class_scores.len());
    for entry in &scores.class_scores {
        if let Some((name, score)) = entry.iter().next() {
            names.push(name.clone());
            values.push(report::format_significant(*score, 5));
        }
    }

    let mut rendered = format!("Predicted class: {}\n", scores.pred_class);
    rendered.push_str(&report::two_row_table(&names, &values));
    Verdict::flagged(CHECKER_NAME, rendered)
}

#[async_trait]
impl SafetyChecker for SensitiveTopicsChecker {
    async fn check(&self, text: &str, _ctx: &CheckContext) -> Result<Verdict, SafetyError> {
        let scores = self.score(text).await?;
        Ok(verdict_from_scores(&scores))
    }

    fn name(&self) -> &str {
        CHECKER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pred_class: &str, classes: &[(&str, f64)]) -> TopicScores {
        TopicScores {
            pred_class: pred_class.to_string(),
            class_scores: classes
                .iter()
                .map(|(name, score)| {
                    let mut entry = BTreeMap::new();
                    entry.insert(name.to_string(), *score);
                    entry
                })
                .collect(),
        }
    }

    #[test]
    fn test_none_class_is_safe_with_empty_report() {
        let verdict = verdict_from_scores(&scores("none", &[("none", 0.98), ("politics", 0.02)]));
        assert!(verdict.is_safe);
        assert_eq!(verdict.checker, "Sensitive Topics");
        assert_eq!(verdict.report, "");
    }

    #[test]
    fn test_other_class_is_unsafe_with_predicted_class_line() {
        let verdict =
            verdict_from_scores(&scores("politics", &[("politics", 0.91234567), ("none", 0.1)]));
        assert!(!verdict.is_safe);
        assert!(verdict.report.starts_with("Predicted class: politics\n"));
    }

    #[test]
    fn test_unsafe_report_formats_scores_to_five_significant_digits() {
        let verdict =
            verdict_from_scores(&scores("politics", &[("politics", 0.91234567), ("none", 0.1)]));
        assert!(verdict.report.contains("0.91235"));
        assert!(verdict.report.contains("0.1"));
    }

    #[test]
    fn test_unsafe_report_table_is_two_rows() {
        let verdict = verdict_from_scores(&scores("religion", &[("religion", 0.7), ("none", 0.3)]));
        // predicted-class line plus the two table rows
        assert_eq!(verdict.report.lines().count(), 3);
        assert!(verdict.report.contains("| religion |"));
    }

    #[test]
    fn test_score_response_deserializes() {
        let body = r#"{
            "all_scores": [{
                "pred_class": "politics",
                "class_scores": [{"politics": 0.9}, {"none": 0.1}]
            }]
        }"#;
        let parsed: ScoreResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.all_scores[0].pred_class, "politics");
        assert_eq!(parsed.all_scores[0].class_scores.len(), 2);
    }
}
