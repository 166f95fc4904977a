use crate::error::SafetyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single candidate token's log-probability at one decoding step.
#[derive(Debug, Clone)]
pub struct TokenScore {
    pub token: String,
    pub logprob: f64,
}

/// Candidate scores for one decoding step.
#[derive(Debug, Clone, Default)]
pub struct StepScores {
    pub top_tokens: Vec<TokenScore>,
}

impl StepScores {
    /// Log-probability the decoder assigned to `token` at this step, if it
    /// ranked among the candidates the backend returned. Token text is
    /// compared with surrounding whitespace stripped.
    pub fn logprob_of(&self, token: &str) -> Option<f64> {
        self.top_tokens
            .iter()
            .find(|candidate| candidate.token.trim() == token)
            .map(|candidate| candidate.logprob)
    }
}

/// Output of a generate-with-scores call.
#[derive(Debug, Clone)]
pub struct ScoredGeneration {
    /// Decoded generation, special tokens skipped.
    pub text: String,

    /// Per-step candidate scores, index-aligned with the generated tokens.
    pub steps: Vec<StepScores>,

    /// Tokenized length of the prompt, as reported by the serving layer.
    pub prompt_tokens: usize,
}

/// Generate-with-scores backend for sequence-to-sequence classifiers.
#[async_trait]
pub trait ScoredGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: u32,
    ) -> Result<ScoredGeneration, SafetyError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
struct GenerateParameters {
    max_new_tokens: u32,
    details: bool,
    decoder_input_details: bool,
    top_n_tokens: u32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    generated_text: String,
    details: GenerateDetails,
}

#[derive(Debug, Deserialize)]
struct GenerateDetails {
    #[serde(default)]
    prefill: Vec<PrefillToken>,
    #[serde(default)]
    top_tokens: Vec<Vec<CandidateToken>>,
}

#[derive(Debug, Deserialize)]
struct PrefillToken {
    #[allow(dead_code)]
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CandidateToken {
    text: String,
    logprob: f64,
}

/// Client for a text-generation-inference-style `/generate` endpoint.
///
/// Requests generation details so the response carries per-step candidate
/// log-probabilities and the tokenized prompt length alongside the decoded
/// text.
pub struct TextGenerationBackend {
    client: reqwest::Client,
    api_url: String,
    timeout_secs: u64,
}

impl TextGenerationBackend {
    pub fn new(api_url: String, timeout_secs: u64) -> Result<Self, SafetyError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            api_url,
            timeout_secs,
        })
    }
}

#[async_trait]
impl ScoredGenerator for TextGenerationBackend {
    async fn generate(
        &self,
        prompt: &str,
        max_new_tokens: u32,
    ) -> Result<ScoredGeneration, SafetyError> {
        let request = GenerateRequest {
            inputs: prompt,
            parameters: GenerateParameters {
                max_new_tokens,
                details: true,
                decoder_input_details: true,
                top_n_tokens: 5,
                do_sample: false,
            },
        };

        log::debug!("scored generation request to {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .timeout(Duration::from_secs(self.timeout_secs))
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
        let parsed: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| SafetyError::InvalidResponse(format!("failed to parse generation: {e}")))?;

        let steps = parsed
            .details
            .top_tokens
            .into_iter()
            .map(|candidates| StepScores {
                top_tokens: candidates
                    .into_iter()
                    .map(|candidate| TokenScore {
                        token: candidate.text,
                        logprob: candidate.logprob,
                    })
                    .collect(),
            })
            .collect();

        Ok(ScoredGeneration {
            text: parsed.generated_text,
            steps,
            prompt_tokens: parsed.details.prefill.len(),
        })
    }
}
