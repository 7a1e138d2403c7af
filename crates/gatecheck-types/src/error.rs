//! Error types for the shared data model

use crate::attempt::BuildStatus;

/// Illegal build status transition
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    /// The transition is not in the allowed table
    #[error("illegal status transition: {from} -> {to}")]
    Illegal {
        /// Current status
        from: BuildStatus,
        /// Requested status
        to: BuildStatus,
    },
}
