//! Build attempt lifecycle
//!
//! A build attempt is one pass of the upstream generator through
//! verification. Attempts chain via `parent_build_id` when retried; the
//! transition table below defines which status mutations are legal.

use crate::error::TransitionError;
use crate::ids::BuildId;
use crate::verdict::FailureContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a build attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// Created, generation not yet started
    Pending,
    /// Generation or deployment in progress
    Running,
    /// Verified and accepted
    Completed,
    /// Failed verification, a child attempt has been dispatched
    Retrying,
    /// Automation exhausted, waiting on a human
    NeedsHelp,
    /// Non-recoverable infrastructure failure
    Failed,
}

impl BuildStatus {
    /// Whether this status is terminal (no further transitions)
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::NeedsHelp | Self::Failed)
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Retrying => "retrying",
            Self::NeedsHelp => "needs_help",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Legal successor statuses for a given status
#[must_use]
pub fn allowed_transitions(from: BuildStatus) -> Vec<BuildStatus> {
    use BuildStatus::*;
    match from {
        Pending => vec![Running, Failed],
        Running => vec![Completed, Retrying, NeedsHelp, Failed],
        // A retrying attempt is closed out by its resolving descendant,
        // or escalated when the chain dies under it.
        Retrying => vec![Completed, NeedsHelp, Failed],
        Completed | NeedsHelp | Failed => vec![],
    }
}

/// Validate a status transition
///
/// # Errors
/// `TransitionError::Illegal` when `to` is not a legal successor of `from`.
pub fn validate_transition(from: BuildStatus, to: BuildStatus) -> Result<(), TransitionError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(TransitionError::Illegal { from, to })
    }
}

/// One execution of the upstream generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildAttempt {
    /// Attempt identifier
    pub build_id: BuildId,
    /// 1-based attempt number within the retry chain
    pub cycle: u32,
    /// Attempt that spawned this retry, if any
    pub parent_build_id: Option<BuildId>,
    /// Original natural-language requirement, immutable across the chain
    pub request: String,
    /// Owning organization
    pub org_id: String,
    /// Requesting user
    pub requester_id: String,
    /// Current lifecycle status
    pub status: BuildStatus,
    /// Descendant attempt that resolved this one, set on chain collapse
    pub resolved_by: Option<BuildId>,
    /// Structured feedback persisted when verification failed
    pub failure_context: Option<FailureContext>,
    /// Compact QA record persisted on success
    pub qa_summary: Option<QaSummary>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl BuildAttempt {
    /// Create a first-cycle attempt
    #[must_use]
    pub fn new(
        build_id: BuildId,
        request: impl Into<String>,
        org_id: impl Into<String>,
        requester_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            build_id,
            cycle: 1,
            parent_build_id: None,
            request: request.into(),
            org_id: org_id.into(),
            requester_id: requester_id.into(),
            status: BuildStatus::Pending,
            resolved_by: None,
            failure_context: None,
            qa_summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// With cycle number
    #[inline]
    #[must_use]
    pub fn with_cycle(mut self, cycle: u32) -> Self {
        self.cycle = cycle;
        self
    }

    /// With parent attempt
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent: BuildId) -> Self {
        self.parent_build_id = Some(parent);
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: BuildStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this attempt has reached a terminal status
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Compact QA record kept on a completed attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaSummary {
    /// Per-artifact `(name, cases_passed, cases_total)` counts
    pub artifacts: Vec<(String, usize, usize)>,
    /// Fidelity judge reasoning
    pub fidelity_reasoning: String,
    /// Mean UX score across artifacts
    pub ux_mean: f64,
}
