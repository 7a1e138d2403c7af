//! Artifact invocation seam
//!
//! Deployed artifacts are reached through this trait so the runner can be
//! exercised against scripted doubles in tests and an HTTP client in
//! production.

use async_trait::async_trait;
use serde_json::Value;

/// Errors from invoking a deployed artifact
#[derive(Debug, Clone, thiserror::Error)]
pub enum InvokeError {
    /// Transport-level failure (connection refused, DNS, 5xx)
    #[error("transport error: {0}")]
    Transport(String),

    /// The call exceeded its deadline
    #[error("invocation timed out")]
    Timeout,

    /// The artifact replied with a non-JSON payload
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Synchronous request/response call against a deployed artifact
///
/// A payload-level `{"error": ...}` reply is a successful invocation from
/// this trait's perspective; only transport problems are `Err`.
#[async_trait]
pub trait ArtifactInvoker: Send + Sync {
    /// Invoke the artifact at `endpoint` with `input`, returning its output
    ///
    /// # Errors
    /// Transport, timeout, or decoding failures.
    async fn invoke(&self, endpoint: &str, input: &Value) -> Result<Value, InvokeError>;
}
