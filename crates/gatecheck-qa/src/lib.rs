//! Gatecheck QA - layered verification pipeline
//!
//! Decides whether a deployed, AI-built service meets the quality bar:
//! - Smoke tests against the live artifact with pattern-matched outputs
//! - Deterministic lint of the declarative UI contract
//! - Judge-mediated semantic fidelity and adversarial UX scoring
//! - Optional, never-blocking headless-browser probing
//! - A coordinator that sequences the stages with short-circuiting and
//!   assembles structured failure feedback

#![warn(unreachable_pub)]

pub mod contract;
pub mod fidelity;
pub mod invoke;
pub mod judge;
pub mod pipeline;
pub mod smoke;
pub mod ux;
pub mod visual;

pub use fidelity::FidelityJudge;
pub use invoke::{ArtifactInvoker, InvokeError};
pub use judge::{extract_first_json, Judge, JudgeError};
pub use pipeline::{build_failure_context, PipelineOutcome, QaPipeline, StageReports};
pub use smoke::SmokeRunner;
pub use ux::UxJudge;
pub use visual::{ProbeError, VisualProbe, VisualVerifier};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the QA pipeline
    pub use crate::{ArtifactInvoker, Judge, PipelineOutcome, QaPipeline, VisualProbe};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
