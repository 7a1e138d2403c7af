//! Semantic fidelity judge
//!
//! Asks a judge whether the deployed artifacts actually do what the
//! original request asked for, fed with the smoke test evidence. The check
//! is scoped to functional correctness; presentation concerns belong to
//! other stages. Fail-open: an unavailable judge or unparseable reply
//! defaults to pass with the error recorded, so judge downtime can never
//! reject a build.

use crate::judge::{extract_first_json, Judge};
use gatecheck_types::{ArtifactDescriptor, FidelityVerdict, QaResult};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Judge reply shape; `pass` and `gaps` re-derived after parsing
#[derive(Debug, Deserialize)]
struct RawVerdict {
    pass: bool,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    gaps: Vec<String>,
}

/// LLM-mediated functional correctness check
#[derive(Clone)]
pub struct FidelityJudge {
    judge: Arc<dyn Judge>,
    call_timeout: Duration,
}

impl FidelityJudge {
    /// Create a fidelity judge over a judge client
    #[must_use]
    pub fn new(judge: Arc<dyn Judge>, call_timeout: Duration) -> Self {
        Self {
            judge,
            call_timeout,
        }
    }

    /// Judge the artifacts against the original request
    pub async fn check(
        &self,
        original_request: &str,
        artifacts: &[ArtifactDescriptor],
        qa_results: &[QaResult],
    ) -> FidelityVerdict {
        let prompt = build_prompt(original_request, artifacts, qa_results);

        let reply = match timeout(self.call_timeout, self.judge.complete(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                tracing::warn!(%err, "fidelity judge unavailable, defaulting to pass");
                return FidelityVerdict::passing(format!(
                    "fidelity judge unavailable, defaulted to pass: {err}"
                ));
            }
            Err(_) => {
                tracing::warn!("fidelity judge timed out, defaulting to pass");
                return FidelityVerdict::passing(
                    "fidelity judge timed out, defaulted to pass".to_string(),
                );
            }
        };

        let Some(value) = extract_first_json(&reply) else {
            tracing::warn!("fidelity judge returned no parseable JSON, defaulting to pass");
            return FidelityVerdict::passing(
                "fidelity judge reply had no parseable JSON, defaulted to pass".to_string(),
            );
        };

        match serde_json::from_value::<RawVerdict>(value) {
            Ok(raw) => FidelityVerdict {
                pass: raw.pass,
                reasoning: raw.reasoning,
                // Gaps only carry meaning on failure
                gaps: if raw.pass { Vec::new() } else { raw.gaps },
            },
            Err(err) => {
                tracing::warn!(%err, "fidelity judge reply had unexpected shape, defaulting to pass");
                FidelityVerdict::passing(format!(
                    "fidelity judge reply had unexpected shape, defaulted to pass: {err}"
                ))
            }
        }
    }
}

/// Assemble the judge prompt: request, artifact surfaces, smoke evidence
fn build_prompt(
    original_request: &str,
    artifacts: &[ArtifactDescriptor],
    qa_results: &[QaResult],
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are reviewing services that were built automatically from a user request."
    );
    let _ = writeln!(prompt, "\nOriginal request:\n{original_request}\n");

    for artifact in artifacts {
        let _ = writeln!(prompt, "Service: {}", artifact.name);
        let _ = writeln!(prompt, "Description: {}", artifact.description);
        let _ = writeln!(prompt, "Input schema: {}", artifact.input_schema);

        if let Some(qa) = qa_results.iter().find(|q| q.artifact_name == artifact.name) {
            let _ = writeln!(prompt, "Smoke test evidence:");
            for case in &qa.cases {
                let _ = writeln!(
                    prompt,
                    "- {} | input: {} | output: {} | {}",
                    case.description,
                    case.input,
                    case.actual_output
                        .as_ref()
                        .map_or_else(|| "<no output>".to_string(), ToString::to_string),
                    if case.passed { "PASS" } else { "FAIL" }
                );
            }
        }
        let _ = writeln!(prompt);
    }

    let _ = writeln!(
        prompt,
        "Judge only functional correctness: do the inputs, outputs, and logic \
         satisfy the request? Ignore cosmetic and presentation differences; \
         those are reviewed separately."
    );
    let _ = writeln!(
        prompt,
        "Reply with strict JSON only: \
         {{\"pass\": bool, \"reasoning\": string, \"gaps\": [string]}}. \
         List concrete functional gaps when pass is false."
    );
    prompt
}
