use crate::{
    checker::{SafetyChecker, Verdict},
    context::CheckContext,
    error::SafetyError,
    report,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the content-safety service key.
pub const CONTENT_SAFETY_KEY_VAR: &str = "CONTENT_SAFETY_KEY";
/// Environment variable holding the content-safety service endpoint URL.
pub const CONTENT_SAFETY_ENDPOINT_VAR: &str = "CONTENT_SAFETY_ENDPOINT";

const CHECKER_NAME: &str = "Azure Content Safety API";
const MAX_INPUT_CHARS: usize = 1000;
const API_VERSION: &str = "2023-10-01";

/// Harm categories analyzed by the content-safety service, in request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextCategory {
    Violence,
    SelfHarm,
    Sexual,
    Hate,
}

impl TextCategory {
    pub fn all() -> [Self; 4] {
        [Self::Violence, Self::SelfHarm, Self::Sexual, Self::Hate]
    }

    /// Category identifier used in service requests and responses.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Violence => "Violence",
            Self::SelfHarm => "SelfHarm",
            Self::Sexual => "Sexual",
            Self::Hate => "Hate",
        }
    }

    /// Column label used in unsafe reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Violence => "VIOLENCE",
            Self::SelfHarm => "SELF_HARM",
            Self::Sexual => "SEXUAL",
            Self::Hate => "HATE",
        }
    }
}

/// Ordinal severity scale returned by the service per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeverityLevel {
    Safe,
    Low,
    Medium,
    High,
}

impl SeverityLevel {
    /// Map a raw severity score (0/2/4/6) onto the four-level scale.
    pub fn from_score(score: i64) -> Result<Self, SafetyError> {
        match score {
            0 => Ok(Self::Safe),
            2 => Ok(Self::Low),
            4 => Ok(Self::Medium),
            6 => Ok(Self::High),
            other => Err(SafetyError::InvalidResponse(format!(
                "unexpected severity score: {other}"
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Safe)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Configuration for the cloud content-safety checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudContentSafetyConfig {
    /// Service endpoint, e.g. `https://<resource>.cognitiveservices.azure.com`.
    pub endpoint: String,

    /// Service subscription key.
    pub api_key: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct AnalyzeTextRequest<'a> {
    text: &'a str,
    categories: Vec<&'static str>,
    #[serde(rename = "outputType")]
    output_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeTextResponse {
    #[serde(rename = "categoriesAnalysis")]
    categories_analysis: Vec<CategoryAnalysis>,
}

#[derive(Debug, Deserialize)]
struct CategoryAnalysis {
    category: String,
    #[serde(default)]
    severity: i64,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: ServiceErrorBody,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Checker backed by the Azure AI Content Safety `text:analyze` API.
pub struct CloudContentSafetyChecker {
    client: reqwest::Client,
    config: CloudContentSafetyConfig,
}

impl CloudContentSafetyChecker {
    pub fn new(config: CloudContentSafetyConfig) -> Result<Self, SafetyError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            config,
        })
    }

    /// Construct from `CONTENT_SAFETY_KEY` and `CONTENT_SAFETY_ENDPOINT`.
    ///
    /// Both are required; either one absent fails fast with
    /// [`SafetyError::ConfigurationMissing`].
    pub fn from_env() -> Result<Self, SafetyError> {
        let api_key = std::env::var(CONTENT_SAFETY_KEY_VAR);
        let endpoint = std::env::var(CONTENT_SAFETY_ENDPOINT_VAR);
        let (Ok(api_key), Ok(endpoint)) = (api_key, endpoint) else {
            return Err(SafetyError::ConfigurationMissing(format!(
                "environment variables not set, please set {CONTENT_SAFETY_KEY_VAR} and {CONTENT_SAFETY_ENDPOINT_VAR}"
            )));
        };
        Self::new(CloudContentSafetyConfig {
            endpoint,
            api_key,
            timeout_secs: default_timeout_secs(),
        })
    }

    async fn analyze(&self, text: &str) -> Result<AnalyzeTextResponse, SafetyError> {
        let url = format!(
            "{}/contentsafety/text:analyze?api-version={API_VERSION}",
            self.config.endpoint.trim_end_matches('/')
        );
        let request = AnalyzeTextRequest {
            text,
            categories: TextCategory::all().iter().map(|c| c.api_name()).collect(),
            output_type: "FourSeverityLevels",
        };

        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
            .json(&request)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ServiceError>(&error_body) {
                Ok(parsed) => (
                    parsed.error.code,
                    parsed.error.message.unwrap_or(error_body),
                ),
                Err(_) => (
                    Some(status.as_u16().to_string()),
                    if error_body.is_empty() {
                        status
                            .canonical_reason()
                            .unwrap_or("unknown error")
                            .to_string()
                    } else {
                        error_body
                    },
                ),
            };
            log::error!("analyze text failed, code: {code:?}, message: {message}");
            return Err(SafetyError::UpstreamCallFailure { code, message });
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            SafetyError::InvalidResponse(format!("failed to parse analyze response: {e}"))
        })
    }
}

fn verdict_from_analysis(analysis: &AnalyzeTextResponse) -> Result<Verdict, SafetyError> {
    let mut severities = Vec::with_capacity(TextCategory::all().len());
    for category in TextCategory::all() {
        let entry = analysis
            .categories_analysis
            .iter()
            .find(|a| a.category == category.api_name())
            .ok_or_else(|| {
                SafetyError::InvalidResponse(format!(
                    "response missing category {}",
                    category.api_name()
                ))
            })?;
        severities.push(SeverityLevel::from_score(entry.severity)?);
    }

    let is_safe = severities.iter().all(SeverityLevel::is_safe);
    if is_safe {
        return Ok(Verdict::safe(CHECKER_NAME));
    }

    let labels: Vec<&str> = TextCategory::all().iter().map(|c| c.label()).collect();
    let values: Vec<&str> = severities.iter().map(|s| s.label()).collect();
    Ok(Verdict::flagged(
        CHECKER_NAME,
        report::two_row_table(&labels, &values),
    ))
}

#[async_trait]
impl SafetyChecker for CloudContentSafetyChecker {
    async fn check(&self, text: &str, _ctx: &CheckContext) -> Result<Verdict, SafetyError> {
        let length = text.chars().count();
        log::debug!("content safety input length: {length}");
        if length > MAX_INPUT_CHARS {
            return Err(SafetyError::InputTooLong {
                length,
                limit: MAX_INPUT_CHARS,
            });
        }

        let analysis = self.analyze(text).await?;
        verdict_from_analysis(&analysis)
    }

    fn name(&self) -> &str {
        CHECKER_NAME
    }
}
