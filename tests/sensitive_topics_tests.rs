//! Sensitive-topics checker tests against a stubbed scoring service.

use llm_output_safety::{
    CheckContext, SafetyChecker, SafetyError, SensitiveTopicsChecker, SensitiveTopicsConfig,
    SENSITIVE_TOPICS_SCORER_URL_VAR,
};
use mockito::Matcher;
use serde_json::json;

fn checker_for(server: &mockito::ServerGuard) -> SensitiveTopicsChecker {
    SensitiveTopicsChecker::new(SensitiveTopicsConfig {
        api_url: format!("{}/safety_scores", server.url()),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_none_prediction_yields_safe_verdict() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/safety_scores")
        .match_body(Matcher::PartialJson(json!({
            "method": "sensitive_topics",
            "data": [{"output": "the weather is nice"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"all_scores":[{"pred_class":"none","class_scores":[{"none":0.97},{"politics":0.03}]}]}"#,
        )
        .create_async()
        .await;

    let checker = checker_for(&server);
    let verdict = checker
        .check("the weather is nice", &CheckContext::default())
        .await
        .unwrap();

    assert!(verdict.is_safe);
    assert_eq!(verdict.checker, "Sensitive Topics");
    assert_eq!(verdict.report, "");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_flagged_prediction_reports_class_and_score_table() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/safety_scores")
        .with_status(200)
        .with_body(
            r#"{"all_scores":[{"pred_class":"politics","class_scores":[{"politics":0.91234567},{"none":0.08765433}]}]}"#,
        )
        .create_async()
        .await;

    let checker = checker_for(&server);
    let verdict = checker
        .check("a charged opinion", &CheckContext::default())
        .await
        .unwrap();

    assert!(!verdict.is_safe);
    let lines: Vec<&str> = verdict.report.lines().collect();
    assert_eq!(lines[0], "Predicted class: politics");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains(" politics "));
    assert!(lines[2].contains("0.91235"));
    assert!(lines[2].contains("0.087654"));
}

#[tokio::test]
async fn test_scorer_error_is_upstream_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/safety_scores")
        .with_status(500)
        .with_body("scorer crashed")
        .create_async()
        .await;

    let checker = checker_for(&server);
    let result = checker.check("some text", &CheckContext::default()).await;

    match result {
        Err(SafetyError::UpstreamCallFailure { code, message }) => {
            assert_eq!(code.as_deref(), Some("500"));
            assert_eq!(message, "scorer crashed");
        }
        other => panic!("expected UpstreamCallFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_all_scores_is_invalid_response() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/safety_scores")
        .with_status(200)
        .with_body(r#"{"all_scores":[]}"#)
        .create_async()
        .await;

    let checker = checker_for(&server);
    let result = checker.check("some text", &CheckContext::default()).await;
    assert!(matches!(result, Err(SafetyError::InvalidResponse(_))));
}

#[test]
fn test_missing_scorer_url_is_dependency_missing_with_instructions() {
    std::env::remove_var(SENSITIVE_TOPICS_SCORER_URL_VAR);
    let result = SensitiveTopicsChecker::from_env();
    match result {
        Err(SafetyError::DependencyMissing {
            dependency,
            instructions,
        }) => {
            assert_eq!(dependency, "auditnlg");
            assert!(instructions.contains("pip install auditnlg"));
        }
        other => panic!("expected DependencyMissing, got {:?}", other.map(|_| ())),
    }
}
