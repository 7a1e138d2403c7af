//! Retry controller
//!
//! Single entry point for resolving a finished verification run:
//! - Success: persist completion, collapse the ancestor retry chain,
//!   notify, and fire best-effort lesson extraction
//! - Failure with budget left: persist feedback and dispatch a rebuild
//!   carrying it; a failed dispatch escalates immediately rather than
//!   stranding the user
//! - Failure with budget exhausted: escalate with a prioritized,
//!   human-readable summary
//!
//! Resolution is idempotent per build id: only a `Running` attempt is ever
//! mutated, so duplicate completion signals are no-ops.

use crate::audit::AuditLog;
use crate::notify::{LessonSink, Notifier, NotifyEvent, NotifyKind, RebuildDispatcher};
use crate::store::{AttemptStore, AttemptUpdate, StoreError};
use gatecheck_qa::PipelineOutcome;
use gatecheck_types::{
    BuildAttempt, BuildId, BuildStatus, FailureContext, QaSummary, RetryConfig,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Actor name stamped on audit entries
const ACTOR: &str = "retry-controller";

/// Outcome of one verification run, as seen by the controller
#[derive(Debug, Clone)]
pub enum RunVerdict {
    /// All blocking stages passed
    Passed {
        /// Compact QA record to persist
        summary: QaSummary,
    },
    /// A blocking stage failed, or the artifact never deployed
    Failed {
        /// Structured feedback for the next attempt
        failure: FailureContext,
    },
}

impl RunVerdict {
    /// Verdict for an attempt whose artifact never came up
    ///
    /// Treated identically to a failed QA run for retry purposes.
    #[must_use]
    pub fn deploy_failure(error: impl Into<String>) -> Self {
        Self::Failed {
            failure: FailureContext::from_deploy_error(error),
        }
    }
}

impl From<PipelineOutcome> for RunVerdict {
    fn from(outcome: PipelineOutcome) -> Self {
        if outcome.passed {
            Self::Passed {
                summary: outcome.summary(),
            }
        } else {
            Self::Failed {
                failure: outcome.failure.unwrap_or_default(),
            }
        }
    }
}

/// What resolution did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Attempt completed; listed ancestors were closed out with it
    Completed {
        /// Ancestors transitioned from retrying to completed
        resolved_ancestors: Vec<BuildId>,
    },
    /// A rebuild was dispatched
    RetryDispatched {
        /// New attempt id
        child: BuildId,
        /// Cycle number of the new attempt
        next_cycle: u32,
    },
    /// Escalated to a human
    Escalated,
    /// The attempt was not awaiting resolution; nothing was mutated
    AlreadyResolved,
}

/// Errors fatal to a resolution call
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// Store failure while loading or mutating the attempt
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No record for the build id
    #[error("attempt not found: {0}")]
    NotFound(BuildId),
}

/// Drives retry-vs-escalate decisions for finished verification runs
#[derive(Clone)]
pub struct RetryController {
    store: Arc<dyn AttemptStore>,
    dispatcher: Arc<dyn RebuildDispatcher>,
    notifier: Arc<dyn Notifier>,
    lessons: Option<Arc<dyn LessonSink>>,
    audit: Arc<AuditLog>,
    config: RetryConfig,
}

impl RetryController {
    /// Wire a controller over its collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn AttemptStore>,
        dispatcher: Arc<dyn RebuildDispatcher>,
        notifier: Arc<dyn Notifier>,
        config: RetryConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            notifier,
            lessons: None,
            audit: Arc::new(AuditLog::new()),
            config,
        }
    }

    /// With a lessons-learned sink
    #[must_use]
    pub fn with_lesson_sink(mut self, sink: Arc<dyn LessonSink>) -> Self {
        self.lessons = Some(sink);
        self
    }

    /// With a shared audit log
    #[must_use]
    pub fn with_audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    /// Audit log handle
    #[inline]
    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Resolve one finished verification run, exactly once per attempt
    ///
    /// # Errors
    /// Store failures on the attempt itself; chain-walk and notification
    /// problems are logged, never raised.
    pub async fn resolve(
        &self,
        build_id: &BuildId,
        verdict: RunVerdict,
    ) -> Result<Resolution, RetryError> {
        let attempt = self
            .store
            .get(build_id)
            .await?
            .ok_or_else(|| RetryError::NotFound(build_id.clone()))?;

        // Idempotency: duplicate completion signals arrive; only an
        // attempt still awaiting its verdict is ever mutated.
        if attempt.status != BuildStatus::Running {
            tracing::debug!(
                build_id = %build_id,
                status = %attempt.status,
                "attempt not awaiting resolution, ignoring duplicate signal"
            );
            return Ok(Resolution::AlreadyResolved);
        }

        match verdict {
            RunVerdict::Passed { summary } => self.resolve_success(&attempt, summary).await,
            RunVerdict::Failed { failure } => {
                if attempt.cycle < self.config.max_cycles {
                    self.resolve_retry(&attempt, failure).await
                } else {
                    self.resolve_escalation(&attempt, &failure, None).await
                }
            }
        }
    }

    /// Success path: complete, collapse ancestors, notify
    async fn resolve_success(
        &self,
        attempt: &BuildAttempt,
        summary: QaSummary,
    ) -> Result<Resolution, RetryError> {
        let build_id = &attempt.build_id;

        self.store
            .update(
                build_id,
                AttemptUpdate::new()
                    .with_status(BuildStatus::Completed)
                    .with_qa_summary(summary),
            )
            .await?;
        self.audit.record(
            build_id,
            ACTOR,
            BuildStatus::Completed,
            "verification passed",
            "",
        );
        tracing::info!(build_id = %build_id, cycle = attempt.cycle, "build completed");

        let resolved_ancestors = if attempt.cycle > 1 {
            self.collapse_chain(attempt).await
        } else {
            Vec::new()
        };

        self.notify_best_effort(NotifyEvent {
            kind: NotifyKind::BuildCompleted,
            build_id: build_id.clone(),
            status: BuildStatus::Completed,
            message: "Your service passed verification and is ready to use.".to_string(),
            cycle: attempt.cycle,
        })
        .await;

        if let Some(sink) = &self.lessons {
            // Side-effect only; runs detached so it can neither delay nor
            // fail the resolution.
            let sink = Arc::clone(sink);
            let id = build_id.clone();
            let request = attempt.request.clone();
            tokio::spawn(async move {
                if let Err(err) = sink.extract(&id, &request).await {
                    tracing::warn!(build_id = %id, %err, "lesson extraction failed");
                }
            });
        }

        Ok(Resolution::Completed { resolved_ancestors })
    }

    /// Walk parent links, completing every ancestor still retrying
    ///
    /// Tolerates missing or already-resolved ancestors: log and stop. A
    /// visited guard caps the walk against malformed parent cycles.
    async fn collapse_chain(&self, attempt: &BuildAttempt) -> Vec<BuildId> {
        let resolver = &attempt.build_id;
        let mut resolved = Vec::new();
        let mut visited: HashSet<BuildId> = HashSet::new();
        visited.insert(resolver.clone());

        let mut current = attempt.parent_build_id.clone();
        while let Some(ancestor_id) = current {
            if !visited.insert(ancestor_id.clone()) {
                tracing::warn!(build_id = %ancestor_id, "parent cycle in retry chain, stopping walk");
                break;
            }

            let ancestor = match self.store.get(&ancestor_id).await {
                Ok(Some(a)) => a,
                Ok(None) => {
                    tracing::warn!(build_id = %ancestor_id, "ancestor missing, stopping chain walk");
                    break;
                }
                Err(err) => {
                    tracing::warn!(build_id = %ancestor_id, %err, "ancestor lookup failed, stopping chain walk");
                    break;
                }
            };

            if ancestor.status != BuildStatus::Retrying {
                tracing::warn!(
                    build_id = %ancestor_id,
                    status = %ancestor.status,
                    "ancestor already resolved, stopping chain walk"
                );
                break;
            }

            let update = AttemptUpdate::new()
                .with_status(BuildStatus::Completed)
                .with_resolved_by(resolver.clone());
            if let Err(err) = self.store.update(&ancestor_id, update).await {
                tracing::warn!(build_id = %ancestor_id, %err, "ancestor update failed, stopping chain walk");
                break;
            }
            self.audit.record(
                &ancestor_id,
                ACTOR,
                BuildStatus::Completed,
                "resolved by descendant",
                resolver.as_str(),
            );

            resolved.push(ancestor_id);
            current = ancestor.parent_build_id;
        }

        resolved
    }

    /// Failure path with cycles remaining: persist feedback, dispatch
    async fn resolve_retry(
        &self,
        attempt: &BuildAttempt,
        failure: FailureContext,
    ) -> Result<Resolution, RetryError> {
        let build_id = &attempt.build_id;
        let next_cycle = attempt.cycle + 1;

        self.store
            .update(
                build_id,
                AttemptUpdate::new()
                    .with_status(BuildStatus::Retrying)
                    .with_failure_context(failure.clone()),
            )
            .await?;
        self.audit.record(
            build_id,
            ACTOR,
            BuildStatus::Retrying,
            "verification failed, rebuilding",
            &format!("next cycle {next_cycle} of {}", self.config.max_cycles),
        );

        match self
            .dispatcher
            .invoke_rebuild(&attempt.request, &failure, next_cycle, build_id)
            .await
        {
            Ok(child) => {
                tracing::info!(
                    build_id = %build_id,
                    child = %child,
                    next_cycle,
                    "rebuild dispatched"
                );
                self.notify_best_effort(NotifyEvent {
                    kind: NotifyKind::BuildRetrying,
                    build_id: build_id.clone(),
                    status: BuildStatus::Retrying,
                    message: format!(
                        "Still working on your request (attempt {next_cycle} of {}).",
                        self.config.max_cycles
                    ),
                    cycle: attempt.cycle,
                })
                .await;
                Ok(Resolution::RetryDispatched { child, next_cycle })
            }
            Err(err) => {
                // Infrastructure failure, not a QA failure: silently
                // dropping the user is worse than under-automating.
                tracing::error!(build_id = %build_id, %err, "rebuild dispatch failed, escalating");
                self.resolve_escalation(attempt, &failure, Some(err.to_string()))
                    .await
            }
        }
    }

    /// Escalation path: persist needs-help and ask a human
    async fn resolve_escalation(
        &self,
        attempt: &BuildAttempt,
        failure: &FailureContext,
        dispatch_error: Option<String>,
    ) -> Result<Resolution, RetryError> {
        let build_id = &attempt.build_id;

        self.store
            .update(
                build_id,
                AttemptUpdate::new()
                    .with_status(BuildStatus::NeedsHelp)
                    .with_failure_context(failure.clone()),
            )
            .await?;

        let reason = dispatch_error.as_deref().unwrap_or("cycle budget exhausted");
        self.audit.record(
            build_id,
            ACTOR,
            BuildStatus::NeedsHelp,
            reason,
            &format!("cycle {} of {}", attempt.cycle, self.config.max_cycles),
        );
        tracing::warn!(build_id = %build_id, reason, "build needs human help");

        self.notify_best_effort(NotifyEvent {
            kind: NotifyKind::NeedsHelp,
            build_id: build_id.clone(),
            status: BuildStatus::NeedsHelp,
            message: escalation_summary(failure, attempt.cycle),
            cycle: attempt.cycle,
        })
        .await;

        Ok(Resolution::Escalated)
    }

    /// Deliver an event, logging instead of propagating failures
    async fn notify_best_effort(&self, event: NotifyEvent) {
        let build_id = event.build_id.clone();
        if let Err(err) = self.notifier.notify(event).await {
            tracing::warn!(build_id = %build_id, %err, "notification delivery failed");
        }
    }
}

/// Compose the one-paragraph human summary for escalation
///
/// First non-empty category wins: contract issues, then UX critique, then
/// fidelity gaps, then a generic QA line.
#[must_use]
pub fn escalation_summary(failure: &FailureContext, cycles_tried: u32) -> String {
    let lead = if !failure.contract_issues.is_empty() {
        let mut issues = failure.contract_issues.iter().take(3).cloned().collect::<Vec<_>>().join("; ");
        if failure.contract_issues.len() > 3 {
            issues.push_str("; ...");
        }
        format!("The service's interface declaration needs attention: {issues}.")
    } else if let Some(report) = failure.ux_reports.first() {
        format!(
            "A first-time user would struggle with '{}': {}",
            report.artifact, report.critique
        )
    } else if !failure.fidelity_gaps.is_empty() {
        format!(
            "The service does not fully do what was asked: {}.",
            failure.fidelity_gaps.join("; ")
        )
    } else if let Some(deploy) = &failure.deploy_error {
        format!("The service failed to deploy: {deploy}.")
    } else if !failure.smoke_failures.is_empty() {
        format!(
            "{} smoke test case(s) failed against the deployed service.",
            failure.smoke_failures.len()
        )
    } else {
        "Automated verification failed without detailed feedback.".to_string()
    };

    format!(
        "{lead} Automated rebuilding was tried {cycles_tried} time(s) without \
         success; this one needs your input."
    )
}
