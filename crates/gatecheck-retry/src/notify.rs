//! Human notification and collaborator seams
//!
//! Notifications are best-effort: a delivery failure is logged by the
//! caller and never fails a resolution. The rebuild dispatcher is the one
//! exception in this module's error policy; a failed dispatch strands the
//! user and escalates immediately.

use async_trait::async_trait;
use gatecheck_types::{BuildId, BuildStatus, FailureContext};
use serde::{Deserialize, Serialize};

/// Errors from the notification channel
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    /// Channel unreachable or rejected the event
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

/// Errors from dispatching a rebuild to the upstream generator
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// Generator unreachable or rejected the request
    #[error("rebuild dispatch failed: {0}")]
    Dispatch(String),
}

/// Errors from the lessons-learned extractor
#[derive(Debug, Clone, thiserror::Error)]
pub enum LessonError {
    /// Extraction failed
    #[error("lesson extraction failed: {0}")]
    Extraction(String),
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    /// Build verified and accepted
    BuildCompleted,
    /// Build failed verification, a retry is underway
    BuildRetrying,
    /// Automation exhausted, human input requested
    NeedsHelp,
}

/// Structured event delivered to the human-facing channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyEvent {
    /// Event kind
    pub kind: NotifyKind,
    /// Subject attempt
    pub build_id: BuildId,
    /// Attempt status after the transition
    pub status: BuildStatus,
    /// Human-readable message; never raw judge text or stack traces
    pub message: String,
    /// Attempt cycle number
    pub cycle: u32,
}

/// Best-effort notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one event
    ///
    /// # Errors
    /// Delivery failures; callers treat these as non-fatal.
    async fn notify(&self, event: NotifyEvent) -> Result<(), NotifyError>;
}

/// Upstream generator re-invocation
///
/// Fire-and-forget from this core's perspective: a successful dispatch
/// returns the new attempt's id and nothing more is awaited.
#[async_trait]
pub trait RebuildDispatcher: Send + Sync {
    /// Kick off a new build attempt carrying the failure feedback
    ///
    /// # Errors
    /// Infrastructure failures reaching the generator.
    async fn invoke_rebuild(
        &self,
        original_request: &str,
        failure: &FailureContext,
        cycle: u32,
        parent_build_id: &BuildId,
    ) -> Result<BuildId, DispatchError>;
}

/// Best-effort extraction of durable lessons from the originating
/// conversation, run on success only
#[async_trait]
pub trait LessonSink: Send + Sync {
    /// Extract and persist lessons for a completed build
    ///
    /// # Errors
    /// Extraction failures; callers treat these as non-fatal.
    async fn extract(&self, build_id: &BuildId, original_request: &str)
        -> Result<(), LessonError>;
}
