//! Adversarial UX judge
//!
//! Scores an artifact the way a first-time, non-technical user would
//! experience it: can they discover what to do, do it, and understand the
//! result. The judge is primed with known low-scoring anti-patterns so
//! scores stay calibrated. Pass is derived from the score mean, never
//! judge-asserted. Fail-open like the fidelity stage: judge trouble yields
//! a default passing verdict with the error noted in the critique.

use crate::judge::{extract_first_json, Judge};
use gatecheck_types::{ArtifactDescriptor, UxScores, UxVerdict, VisualResult};
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Score assigned on judge failure; keeps the mean at a passing 7.0
const FAIL_OPEN_SCORE: f64 = 7.0;

/// Judge reply shape
#[derive(Debug, Deserialize)]
struct RawUx {
    scores: RawScores,
    #[serde(default)]
    critique: String,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawScores {
    discoverability: f64,
    ease_of_use: f64,
    result_clarity: f64,
}

/// LLM-mediated usability scoring
#[derive(Clone)]
pub struct UxJudge {
    judge: Arc<dyn Judge>,
    pass_threshold: f64,
    call_timeout: Duration,
}

impl UxJudge {
    /// Create a UX judge with the given pass threshold on the score mean
    #[must_use]
    pub fn new(judge: Arc<dyn Judge>, pass_threshold: f64, call_timeout: Duration) -> Self {
        Self {
            judge,
            pass_threshold,
            call_timeout,
        }
    }

    /// Score one artifact from a simulated first-time user's perspective
    pub async fn score(
        &self,
        artifact: &ArtifactDescriptor,
        original_request: &str,
        visual: Option<&VisualResult>,
    ) -> UxVerdict {
        let prompt = build_prompt(artifact, original_request, visual);

        let reply = match timeout(self.call_timeout, self.judge.complete(&prompt)).await {
            Ok(Ok(text)) => text,
            Ok(Err(err)) => {
                tracing::warn!(artifact = %artifact.name, %err, "ux judge unavailable, defaulting to pass");
                return self.fail_open(format!("ux judge unavailable, defaulted to pass: {err}"));
            }
            Err(_) => {
                tracing::warn!(artifact = %artifact.name, "ux judge timed out, defaulting to pass");
                return self.fail_open("ux judge timed out, defaulted to pass".to_string());
            }
        };

        let parsed = extract_first_json(&reply)
            .and_then(|value| serde_json::from_value::<RawUx>(value).ok());

        match parsed {
            Some(raw) => {
                let scores = UxScores {
                    discoverability: clamp_score(raw.scores.discoverability),
                    ease_of_use: clamp_score(raw.scores.ease_of_use),
                    result_clarity: clamp_score(raw.scores.result_clarity),
                };
                UxVerdict::from_scores(scores, self.pass_threshold, raw.critique, raw.suggestions)
            }
            None => {
                tracing::warn!(artifact = %artifact.name, "ux judge reply unparseable, defaulting to pass");
                self.fail_open("ux judge reply was unparseable, defaulted to pass".to_string())
            }
        }
    }

    /// Default passing verdict used when the judge cannot be consulted
    fn fail_open(&self, critique: String) -> UxVerdict {
        let scores = UxScores {
            discoverability: FAIL_OPEN_SCORE,
            ease_of_use: FAIL_OPEN_SCORE,
            result_clarity: FAIL_OPEN_SCORE,
        };
        UxVerdict::from_scores(scores, self.pass_threshold, critique, Vec::new())
    }
}

/// Scores live on a 1-10 scale regardless of what the judge returns
fn clamp_score(score: f64) -> f64 {
    score.clamp(1.0, 10.0)
}

/// Assemble the role-played first-time-user prompt
fn build_prompt(
    artifact: &ArtifactDescriptor,
    original_request: &str,
    visual: Option<&VisualResult>,
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Role-play a non-technical person using this tool for the first \
         time, with no documentation and no patience for jargon."
    );
    let _ = writeln!(prompt, "\nWhat they originally asked for:\n{original_request}\n");
    let _ = writeln!(prompt, "Tool: {}", artifact.name);
    let _ = writeln!(prompt, "Description: {}", artifact.description);

    if let Some(contract) = &artifact.ui_contract {
        let _ = writeln!(prompt, "Example inputs offered: {}", contract.example_inputs.len());
        for field in &contract.input_fields {
            let _ = writeln!(
                prompt,
                "Field: {} (label: {})",
                field.key,
                field.label.as_deref().unwrap_or("<none>")
            );
        }
    }

    if let Some(v) = visual {
        let _ = writeln!(prompt, "\nWhat a browser probe saw:");
        let _ = writeln!(prompt, "Form region: {}", v.form_snapshot);
        let _ = writeln!(prompt, "Result region: {}", v.result_snapshot);
        for issue in &v.issues {
            let _ = writeln!(prompt, "Observed issue: {issue}");
        }
    }

    let _ = writeln!(
        prompt,
        "\nScore 1-10 on discoverability (can they find what to do), \
         ease_of_use (can they do it), and result_clarity (do results make \
         sense without context). Known failure patterns that should score \
         low: machine_cased field labels, no try-it examples, raw data \
         dumps as results."
    );
    let _ = writeln!(
        prompt,
        "Reply with strict JSON only: {{\"scores\": {{\"discoverability\": n, \
         \"ease_of_use\": n, \"result_clarity\": n}}, \"critique\": string, \
         \"suggestions\": [string]}}."
    );
    prompt
}
