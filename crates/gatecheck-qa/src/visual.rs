//! Visual verifier integration
//!
//! Delegates to an external headless-browser probe when one is configured.
//! Browser automation is the flakiest stage in the pipeline, so this
//! integration never blocks a build on its own: unreachable, unconfigured,
//! or timed-out probes yield `None` and the pipeline moves on. Probe
//! observations feed the UX judge and the failure context only.

use async_trait::async_trait;
use gatecheck_types::VisualResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Errors from the browser probe service
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    /// Probe service unreachable
    #[error("probe unreachable: {0}")]
    Unreachable(String),

    /// Probe run failed mid-flight
    #[error("probe failed: {0}")]
    Failed(String),
}

/// External headless-browser probe
#[async_trait]
pub trait VisualProbe: Send + Sync {
    /// Probe the deployed artifact's page by name
    ///
    /// # Errors
    /// Transport or probe-run failures.
    async fn probe(&self, artifact_name: &str) -> Result<VisualResult, ProbeError>;
}

/// Non-blocking wrapper over an optional probe
#[derive(Clone, Default)]
pub struct VisualVerifier {
    probe: Option<Arc<dyn VisualProbe>>,
    call_timeout: Duration,
}

impl VisualVerifier {
    /// Verifier with no probe configured; `run` always yields `None`
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            probe: None,
            call_timeout: Duration::ZERO,
        }
    }

    /// Verifier over a configured probe
    #[must_use]
    pub fn new(probe: Arc<dyn VisualProbe>, call_timeout: Duration) -> Self {
        Self {
            probe: Some(probe),
            call_timeout,
        }
    }

    /// Probe one artifact; `None` when unconfigured, unreachable, or timed out
    pub async fn run(&self, artifact_name: &str) -> Option<VisualResult> {
        let probe = self.probe.as_ref()?;

        match timeout(self.call_timeout, probe.probe(artifact_name)).await {
            Ok(Ok(result)) => {
                tracing::debug!(
                    artifact = artifact_name,
                    issues = result.issues.len(),
                    "visual probe completed"
                );
                Some(result)
            }
            Ok(Err(err)) => {
                tracing::warn!(artifact = artifact_name, %err, "visual probe failed, skipping");
                None
            }
            Err(_) => {
                tracing::warn!(artifact = artifact_name, "visual probe timed out, skipping");
                None
            }
        }
    }
}
