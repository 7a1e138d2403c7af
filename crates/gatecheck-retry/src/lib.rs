//! Gatecheck Retry - adaptive retry orchestration
//!
//! Turns a verification verdict into exactly one of: completion (with
//! retry-chain collapse), a context-carrying rebuild dispatch, or a human
//! escalation. Collaborators (attempt store, upstream generator,
//! notification channel, lesson extraction) sit behind async traits; the
//! audit log records every status transition on a tamper-evident chain.

#![warn(unreachable_pub)]

pub mod audit;
pub mod controller;
pub mod notify;
pub mod store;

pub use audit::{AuditEntry, AuditError, AuditLog};
pub use controller::{escalation_summary, Resolution, RetryController, RetryError, RunVerdict};
pub use notify::{
    DispatchError, LessonError, LessonSink, Notifier, NotifyError, NotifyEvent, NotifyKind,
    RebuildDispatcher,
};
pub use store::{AttemptStore, AttemptUpdate, StoreError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the retry controller
    pub use crate::{
        AttemptStore, Notifier, RebuildDispatcher, Resolution, RetryController, RunVerdict,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
