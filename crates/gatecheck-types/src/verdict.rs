//! Verification outcomes
//!
//! Per-stage results, the combined verdict, and the structured
//! `FailureContext` fed back into the next retry attempt. All types are
//! created fresh per verification run and never mutated afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-artifact smoke test outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaResult {
    /// Artifact under test
    pub artifact_name: String,
    /// Per-case results, in declaration order
    pub cases: Vec<CaseResult>,
    /// AND over all cases; vacuously true with zero cases
    pub all_passed: bool,
}

impl QaResult {
    /// Assemble a result from case outcomes
    #[must_use]
    pub fn new(artifact_name: impl Into<String>, cases: Vec<CaseResult>) -> Self {
        let all_passed = cases.iter().all(|c| c.passed);
        Self {
            artifact_name: artifact_name.into(),
            cases,
            all_passed,
        }
    }

    /// Number of passing cases
    #[inline]
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }
}

/// Outcome of a single smoke test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// Case description
    pub description: String,
    /// Input sent to the artifact
    pub input: Value,
    /// Expected-output pattern
    pub expected: Value,
    /// Observed output, if the call produced one
    pub actual_output: Option<Value>,
    /// Whether the observed output matched the pattern
    pub passed: bool,
    /// Invocation or payload error, if any
    pub error: Option<String>,
}

/// Semantic fidelity verdict from the judge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FidelityVerdict {
    /// Whether behavior matches the original request
    pub pass: bool,
    /// Judge reasoning
    pub reasoning: String,
    /// Functional gaps; empty when `pass` is true
    #[serde(default)]
    pub gaps: Vec<String>,
}

impl FidelityVerdict {
    /// Passing verdict with the given reasoning
    #[inline]
    #[must_use]
    pub fn passing(reasoning: impl Into<String>) -> Self {
        Self {
            pass: true,
            reasoning: reasoning.into(),
            gaps: Vec::new(),
        }
    }
}

/// UX dimension scores, each 1-10
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UxScores {
    /// Can a first-time user find what to do
    pub discoverability: f64,
    /// Can they do it without instructions
    pub ease_of_use: f64,
    /// Do results make sense without context
    pub result_clarity: f64,
}

impl UxScores {
    /// Mean of the three dimensions, rounded to one decimal
    #[must_use]
    pub fn mean(&self) -> f64 {
        let mean = (self.discoverability + self.ease_of_use + self.result_clarity) / 3.0;
        (mean * 10.0).round() / 10.0
    }
}

/// Adversarial UX verdict; `pass` is derived from the mean, not judge-asserted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UxVerdict {
    /// Dimension scores
    pub scores: UxScores,
    /// Mean score, one decimal
    pub mean: f64,
    /// Derived: mean >= configured threshold
    pub pass: bool,
    /// Judge critique
    pub critique: String,
    /// Concrete improvement suggestions
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl UxVerdict {
    /// Derive a verdict from scores against a pass threshold
    #[must_use]
    pub fn from_scores(
        scores: UxScores,
        threshold: f64,
        critique: impl Into<String>,
        suggestions: Vec<String>,
    ) -> Self {
        let mean = scores.mean();
        Self {
            scores,
            mean,
            pass: mean >= threshold,
            critique: critique.into(),
            suggestions,
        }
    }
}

/// Headless-browser probe observations for one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualResult {
    /// Page loaded without errors
    pub page_loaded: bool,
    /// An interactive form was present
    pub form_present: bool,
    /// Number of input fields found
    pub field_count: usize,
    /// Number of try-it example affordances found
    pub example_count: usize,
    /// An example was clicked and populated the form
    pub example_exercised: bool,
    /// Submitting produced a visible result
    pub submission_rendered: bool,
    /// Free-text issues observed
    pub issues: Vec<String>,
    /// Accessibility snapshot of the form region
    pub form_snapshot: String,
    /// Accessibility snapshot of the result region
    pub result_snapshot: String,
}

/// One failed smoke case, flattened for feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeFailure {
    /// Owning artifact
    pub artifact: String,
    /// Case description
    pub case_description: String,
    /// Input sent
    pub input: Value,
    /// Expected pattern
    pub expected: Value,
    /// Observed output, if any
    pub actual: Option<Value>,
    /// Invocation error, if any
    pub error: Option<String>,
}

/// Per-artifact UX feedback carried into the failure context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UxReport {
    /// Artifact scored
    pub artifact: String,
    /// Dimension scores
    pub scores: UxScores,
    /// Judge critique
    pub critique: String,
    /// Improvement suggestions
    pub suggestions: Vec<String>,
}

/// Structured, self-contained feedback for the next retry attempt
///
/// This object, and only this object, crosses the boundary back into the
/// next build attempt's input; the next attempt may run with a fresh
/// context, so nothing in here may reference external state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FailureContext {
    /// Smoke failures, grouped by artifact in declaration order
    pub smoke_failures: Vec<SmokeFailure>,
    /// Fidelity gaps from the semantic judge
    pub fidelity_gaps: Vec<String>,
    /// Contract validation issues
    pub contract_issues: Vec<String>,
    /// Visual probe issues
    pub visual_issues: Vec<String>,
    /// UX scores, critique, suggestions per artifact
    pub ux_reports: Vec<UxReport>,
    /// Deployment error, for attempts that never came up
    pub deploy_error: Option<String>,
}

impl FailureContext {
    /// Synthetic context for an artifact that never deployed
    #[must_use]
    pub fn from_deploy_error(error: impl Into<String>) -> Self {
        Self {
            deploy_error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Whether any feedback is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.smoke_failures.is_empty()
            && self.fidelity_gaps.is_empty()
            && self.contract_issues.is_empty()
            && self.visual_issues.is_empty()
            && self.ux_reports.is_empty()
            && self.deploy_error.is_none()
    }
}
