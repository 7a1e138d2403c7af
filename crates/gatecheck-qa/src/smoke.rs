//! Smoke test runner
//!
//! Drives a deployed artifact through its declared test cases:
//! - Bounded invocation retries with linear backoff for cold starts
//! - Payload-level `error` replies fail the case unless the pattern
//!   expects an `error` field
//! - Pass/fail per case via the pattern matcher

use crate::invoke::{ArtifactInvoker, InvokeError};
use gatecheck_match::PatternMatcher;
use gatecheck_types::{ArtifactDescriptor, CaseResult, QaConfig, QaResult, TestCase};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, timeout};

/// Runs smoke test cases against deployed artifacts
#[derive(Clone)]
pub struct SmokeRunner {
    invoker: Arc<dyn ArtifactInvoker>,
    matcher: PatternMatcher,
    config: QaConfig,
}

impl SmokeRunner {
    /// Create a runner over an invoker
    #[must_use]
    pub fn new(invoker: Arc<dyn ArtifactInvoker>, config: QaConfig) -> Self {
        Self {
            invoker,
            matcher: PatternMatcher::with_tolerance(config.tolerance),
            config,
        }
    }

    /// Run all test cases for one artifact
    ///
    /// Cases execute in declaration order for deterministic reports. An
    /// artifact with zero cases passes vacuously; flagging weak test
    /// coverage is an upstream concern.
    pub async fn run(&self, artifact: &ArtifactDescriptor) -> QaResult {
        tracing::info!(
            artifact = %artifact.name,
            cases = artifact.test_cases.len(),
            "running smoke tests"
        );

        if !artifact.test_cases.is_empty() {
            // Cold-start settling before the first call
            sleep(self.config.settle_delay).await;
        }

        let mut cases = Vec::with_capacity(artifact.test_cases.len());
        for case in &artifact.test_cases {
            let result = self.run_case(artifact, case).await;
            if !result.passed {
                tracing::warn!(
                    artifact = %artifact.name,
                    case = %case.description,
                    error = ?result.error,
                    "smoke case failed"
                );
            }
            cases.push(result);
        }

        QaResult::new(&artifact.name, cases)
    }

    /// Run a single case with invocation retries
    async fn run_case(&self, artifact: &ArtifactDescriptor, case: &TestCase) -> CaseResult {
        match self.invoke_with_retry(&artifact.endpoint, &case.input).await {
            Ok(output) => {
                // A payload-level error is a failure unless the case
                // explicitly expects one (artifacts may legitimately
                // report user-input errors).
                if let Some(err) = payload_error(&output) {
                    if !expects_error(&case.expected) {
                        return CaseResult {
                            description: case.description.clone(),
                            input: case.input.clone(),
                            expected: case.expected.clone(),
                            actual_output: Some(output.clone()),
                            passed: false,
                            error: Some(err),
                        };
                    }
                }

                let passed = self.matcher.matches(&output, &case.expected);
                CaseResult {
                    description: case.description.clone(),
                    input: case.input.clone(),
                    expected: case.expected.clone(),
                    actual_output: Some(output),
                    passed,
                    error: None,
                }
            }
            Err(err) => CaseResult {
                description: case.description.clone(),
                input: case.input.clone(),
                expected: case.expected.clone(),
                actual_output: None,
                passed: false,
                error: Some(err.to_string()),
            },
        }
    }

    /// Invoke with bounded retries and linear backoff (attempt x unit)
    async fn invoke_with_retry(&self, endpoint: &str, input: &Value) -> Result<Value, InvokeError> {
        let mut last_err = InvokeError::Transport("no attempts made".to_string());

        for attempt in 1..=self.config.invoke_attempts {
            match timeout(self.config.call_timeout, self.invoker.invoke(endpoint, input)).await {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(err)) => last_err = err,
                Err(_) => last_err = InvokeError::Timeout,
            }

            if attempt < self.config.invoke_attempts {
                let backoff = self.config.backoff_unit * attempt;
                tracing::debug!(endpoint, attempt, ?backoff, "invocation failed, backing off");
                sleep(backoff).await;
            }
        }

        Err(last_err)
    }
}

/// Error text from a payload-level `error` field, if present
fn payload_error(output: &Value) -> Option<String> {
    let err = output.as_object()?.get("error")?;
    Some(match err.as_str() {
        Some(s) => s.to_string(),
        None => err.to_string(),
    })
}

/// Whether the expected pattern declares an `error` field
fn expects_error(expected: &Value) -> bool {
    expected
        .as_object()
        .is_some_and(|m| m.contains_key("error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_error_extraction() {
        assert_eq!(
            payload_error(&json!({"error": "city required"})),
            Some("city required".to_string())
        );
        assert_eq!(
            payload_error(&json!({"error": {"code": 400}})),
            Some("{\"code\":400}".to_string())
        );
        assert!(payload_error(&json!({"output": 1})).is_none());
        assert!(payload_error(&json!(42)).is_none());
    }

    #[test]
    fn expected_error_detection() {
        assert!(expects_error(&json!({"error": "not found"})));
        assert!(!expects_error(&json!({"celsius": 20})));
        assert!(!expects_error(&json!("scalar")));
    }
}
