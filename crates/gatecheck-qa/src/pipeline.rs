//! QA pipeline coordinator
//!
//! Sequences the verification stages over one build's artifacts:
//!
//! ```text
//! smoke -> fidelity -> contract -> visual (non-blocking) -> ux
//! ```
//!
//! Cheap deterministic checks run before judge calls; fidelity runs before
//! presentation scoring so a functionally wrong artifact never wastes UX
//! cycles. Short-circuiting and blocking behavior come from the stage
//! policy table, and the failure context is assembled only from stages
//! that actually ran.

use crate::contract;
use crate::fidelity::FidelityJudge;
use crate::invoke::ArtifactInvoker;
use crate::judge::Judge;
use crate::smoke::SmokeRunner;
use crate::ux::UxJudge;
use crate::visual::{VisualProbe, VisualVerifier};
use gatecheck_types::{
    ArtifactDescriptor, FailureContext, FidelityVerdict, QaConfig, QaResult, QaSummary, RunId,
    SmokeFailure, Stage, UxReport, UxVerdict, VisualResult,
};
use std::sync::Arc;

/// Raw per-stage outputs from one verification run
///
/// Stages skipped by short-circuit stay empty/`None`; they are never re-run
/// speculatively to enrich a report.
#[derive(Debug, Default)]
pub struct StageReports {
    /// Smoke results per artifact
    pub smoke: Vec<QaResult>,
    /// Fidelity verdict, when the stage ran
    pub fidelity: Option<FidelityVerdict>,
    /// Contract issues, when the stage ran (empty vec means it passed)
    pub contract_issues: Option<Vec<String>>,
    /// Visual observations per probed artifact
    pub visual: Vec<(String, VisualResult)>,
    /// UX verdicts per artifact
    pub ux: Vec<(String, UxVerdict)>,
}

/// Combined outcome of one verification run
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Run identifier
    pub run_id: RunId,
    /// AND over all blocking stages
    pub passed: bool,
    /// Raw stage outputs
    pub reports: StageReports,
    /// Structured feedback, present iff the run failed
    pub failure: Option<FailureContext>,
}

impl PipelineOutcome {
    /// Compact summary for persisting on a completed attempt
    #[must_use]
    pub fn summary(&self) -> QaSummary {
        let artifacts = self
            .reports
            .smoke
            .iter()
            .map(|qa| (qa.artifact_name.clone(), qa.passed_count(), qa.cases.len()))
            .collect();

        let ux_mean = if self.reports.ux.is_empty() {
            0.0
        } else {
            let sum: f64 = self.reports.ux.iter().map(|(_, v)| v.mean).sum();
            let mean = sum / self.reports.ux.len() as f64;
            (mean * 10.0).round() / 10.0
        };

        QaSummary {
            artifacts,
            fidelity_reasoning: self
                .reports
                .fidelity
                .as_ref()
                .map(|v| v.reasoning.clone())
                .unwrap_or_default(),
            ux_mean,
        }
    }
}

/// Coordinates one verification run per completed build attempt
#[derive(Clone)]
pub struct QaPipeline {
    smoke: SmokeRunner,
    fidelity: FidelityJudge,
    ux: UxJudge,
    visual: VisualVerifier,
}

impl QaPipeline {
    /// Wire a pipeline over an invoker and a judge client
    #[must_use]
    pub fn new(invoker: Arc<dyn ArtifactInvoker>, judge: Arc<dyn Judge>, config: QaConfig) -> Self {
        Self {
            smoke: SmokeRunner::new(invoker, config.clone()),
            fidelity: FidelityJudge::new(Arc::clone(&judge), config.call_timeout),
            ux: UxJudge::new(judge, config.ux_pass_threshold, config.call_timeout),
            visual: VisualVerifier::disabled(),
        }
    }

    /// With a configured browser probe
    #[must_use]
    pub fn with_visual_probe(mut self, probe: Arc<dyn VisualProbe>, config: &QaConfig) -> Self {
        self.visual = VisualVerifier::new(probe, config.call_timeout);
        self
    }

    /// Run the full pipeline for one build
    pub async fn verify(
        &self,
        original_request: &str,
        artifacts: &[ArtifactDescriptor],
    ) -> PipelineOutcome {
        let run_id = RunId::new();
        let mut reports = StageReports::default();

        tracing::info!(%run_id, artifacts = artifacts.len(), "verification run started");

        // Stage 1: smoke tests, per artifact in declaration order
        for artifact in artifacts {
            reports.smoke.push(self.smoke.run(artifact).await);
        }
        let smoke_failed = reports.smoke.iter().any(|qa| !qa.all_passed);
        if smoke_failed && Stage::Smoke.policy().blocking {
            tracing::info!(%run_id, "smoke stage failed, short-circuiting");
            return Self::failed(run_id, reports);
        }

        // Stage 2: semantic fidelity, only on smoke-clean builds
        let verdict = self
            .fidelity
            .check(original_request, artifacts, &reports.smoke)
            .await;
        let fidelity_failed = !verdict.pass;
        reports.fidelity = Some(verdict);
        if fidelity_failed && Stage::Fidelity.policy().blocking {
            tracing::info!(%run_id, "fidelity stage failed, short-circuiting");
            return Self::failed(run_id, reports);
        }

        // Stage 3: contract shape
        let issues = contract::validate_all(artifacts);
        let contract_failed = !issues.is_empty();
        reports.contract_issues = Some(issues);
        if contract_failed && Stage::Contract.policy().blocking {
            tracing::info!(%run_id, "contract stage failed, short-circuiting");
            return Self::failed(run_id, reports);
        }

        // Stage 4: visual probe; collects issues, never blocks by itself
        for artifact in artifacts {
            if let Some(result) = self.visual.run(&artifact.name).await {
                reports.visual.push((artifact.name.clone(), result));
            }
        }

        // Stage 5: adversarial UX, fed with any visual observations
        for artifact in artifacts {
            let visual = reports
                .visual
                .iter()
                .find(|(name, _)| name == &artifact.name)
                .map(|(_, v)| v);
            let verdict = self.ux.score(artifact, original_request, visual).await;
            reports.ux.push((artifact.name.clone(), verdict));
        }
        let ux_failed = reports.ux.iter().any(|(_, v)| !v.pass);
        if ux_failed && Stage::Ux.policy().blocking {
            tracing::info!(%run_id, "ux stage failed");
            return Self::failed(run_id, reports);
        }

        tracing::info!(%run_id, "verification run passed");
        PipelineOutcome {
            run_id,
            passed: true,
            reports,
            failure: None,
        }
    }

    /// Failing outcome with feedback assembled from the stages that ran
    fn failed(run_id: RunId, reports: StageReports) -> PipelineOutcome {
        let failure = build_failure_context(&reports);
        PipelineOutcome {
            run_id,
            passed: false,
            reports,
            failure: Some(failure),
        }
    }
}

/// Assemble the self-contained feedback object from stage reports
#[must_use]
pub fn build_failure_context(reports: &StageReports) -> FailureContext {
    let smoke_failures = reports
        .smoke
        .iter()
        .flat_map(|qa| {
            qa.cases
                .iter()
                .filter(|case| !case.passed)
                .map(move |case| SmokeFailure {
                    artifact: qa.artifact_name.clone(),
                    case_description: case.description.clone(),
                    input: case.input.clone(),
                    expected: case.expected.clone(),
                    actual: case.actual_output.clone(),
                    error: case.error.clone(),
                })
        })
        .collect();

    let fidelity_gaps = reports
        .fidelity
        .as_ref()
        .filter(|v| !v.pass)
        .map(|v| v.gaps.clone())
        .unwrap_or_default();

    let visual_issues = reports
        .visual
        .iter()
        .flat_map(|(name, v)| v.issues.iter().map(move |i| format!("{name}: {i}")))
        .collect();

    let ux_reports = reports
        .ux
        .iter()
        .filter(|(_, v)| !v.pass)
        .map(|(name, v)| UxReport {
            artifact: name.clone(),
            scores: v.scores,
            critique: v.critique.clone(),
            suggestions: v.suggestions.clone(),
        })
        .collect();

    FailureContext {
        smoke_failures,
        fidelity_gaps,
        contract_issues: reports.contract_issues.clone().unwrap_or_default(),
        visual_issues,
        ux_reports,
        deploy_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatecheck_types::{CaseResult, UxScores};
    use serde_json::json;

    #[test]
    fn failure_context_only_from_ran_stages() {
        // Smoke failed and short-circuited: fidelity/contract never ran
        let reports = StageReports {
            smoke: vec![QaResult::new(
                "weather",
                vec![CaseResult {
                    description: "Oslo".to_string(),
                    input: json!({"city": "Oslo"}),
                    expected: json!({"celsius": 20}),
                    actual_output: Some(json!({"celsius": 90})),
                    passed: false,
                    error: None,
                }],
            )],
            ..StageReports::default()
        };

        let ctx = build_failure_context(&reports);
        assert_eq!(ctx.smoke_failures.len(), 1);
        assert!(ctx.fidelity_gaps.is_empty());
        assert!(ctx.contract_issues.is_empty());
        assert!(ctx.ux_reports.is_empty());
    }

    #[test]
    fn passing_ux_not_in_failure_context() {
        let good = UxVerdict::from_scores(
            UxScores {
                discoverability: 8.0,
                ease_of_use: 8.0,
                result_clarity: 8.0,
            },
            6.0,
            "fine",
            vec![],
        );
        let bad = UxVerdict::from_scores(
            UxScores {
                discoverability: 3.0,
                ease_of_use: 3.0,
                result_clarity: 3.0,
            },
            6.0,
            "cryptic",
            vec!["rename fields".to_string()],
        );

        let reports = StageReports {
            ux: vec![("alpha".to_string(), good), ("beta".to_string(), bad)],
            ..StageReports::default()
        };

        let ctx = build_failure_context(&reports);
        assert_eq!(ctx.ux_reports.len(), 1);
        assert_eq!(ctx.ux_reports[0].artifact, "beta");
    }
}
