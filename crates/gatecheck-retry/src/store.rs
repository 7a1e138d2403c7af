//! Durable attempt store seam
//!
//! Build attempts live in an external record store. Lookups are keyed by
//! build id alone so callers that learn an id from a completion signal can
//! resolve it without knowing ownership ahead of time.

use async_trait::async_trait;
use gatecheck_types::{BuildAttempt, BuildId, BuildStatus, FailureContext, QaSummary};

/// Errors from the attempt store
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable or query failed
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Record exists but could not be decoded
    #[error("corrupt attempt record for {0}: {1}")]
    Corrupt(BuildId, String),
}

/// Partial update applied to an attempt record
///
/// Only set fields are written; the store stamps `updated_at`.
#[derive(Debug, Clone, Default)]
pub struct AttemptUpdate {
    /// New status
    pub status: Option<BuildStatus>,
    /// Resolving descendant id
    pub resolved_by: Option<BuildId>,
    /// Failure feedback to persist
    pub failure_context: Option<FailureContext>,
    /// QA summary to persist
    pub qa_summary: Option<QaSummary>,
}

impl AttemptUpdate {
    /// Empty update
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: BuildStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// With resolving descendant
    #[inline]
    #[must_use]
    pub fn with_resolved_by(mut self, resolver: BuildId) -> Self {
        self.resolved_by = Some(resolver);
        self
    }

    /// With failure context
    #[inline]
    #[must_use]
    pub fn with_failure_context(mut self, context: FailureContext) -> Self {
        self.failure_context = Some(context);
        self
    }

    /// With QA summary
    #[inline]
    #[must_use]
    pub fn with_qa_summary(mut self, summary: QaSummary) -> Self {
        self.qa_summary = Some(summary);
        self
    }
}

/// Durable build attempt records
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Fetch an attempt by id; `None` when no record exists
    ///
    /// # Errors
    /// Backend failures.
    async fn get(&self, build_id: &BuildId) -> Result<Option<BuildAttempt>, StoreError>;

    /// Apply a partial update to an attempt record
    ///
    /// # Errors
    /// Backend failures, or no record for `build_id`.
    async fn update(&self, build_id: &BuildId, update: AttemptUpdate) -> Result<(), StoreError>;
}
