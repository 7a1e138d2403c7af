//! Gatecheck Backend - production wiring
//!
//! Binds the QA pipeline's trait seams to real services:
//! - `HttpArtifactInvoker`: JSON POST against a deployed artifact's address
//! - `HttpJudge`: text-completion call against a model-serving endpoint
//!
//! Both clients carry their own request timeout on top of the pipeline's
//! per-call deadline, and map transport problems into the seam error types
//! so callers never see `reqwest` errors directly.

#![warn(unreachable_pub)]

use async_trait::async_trait;
use gatecheck_qa::{ArtifactInvoker, InvokeError, Judge, JudgeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Initialize tracing from the environment, defaulting to `info`
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Invokes deployed artifacts over HTTP
///
/// Requests are `POST endpoint` with `{"input": ...}`; replies are passed
/// through as-is so payload-level `error` fields reach the smoke runner.
#[derive(Debug, Clone)]
pub struct HttpArtifactInvoker {
    client: reqwest::Client,
}

impl HttpArtifactInvoker {
    /// Create an invoker with the given request timeout
    ///
    /// # Errors
    /// Client construction failures (TLS backend, bad configuration).
    pub fn new(timeout: Duration) -> Result<Self, InvokeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InvokeError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    input: &'a Value,
}

#[async_trait]
impl ArtifactInvoker for HttpArtifactInvoker {
    async fn invoke(&self, endpoint: &str, input: &Value) -> Result<Value, InvokeError> {
        let response = self
            .client
            .post(endpoint)
            .json(&InvokeRequest { input })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InvokeError::Timeout
                } else {
                    InvokeError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(InvokeError::Transport(format!(
                "artifact returned HTTP {status}"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| InvokeError::MalformedResponse(e.to_string()))
    }
}

/// Text-completion client against a model-serving endpoint
#[derive(Debug, Clone)]
pub struct HttpJudge {
    client: reqwest::Client,
    completion_url: String,
    model: String,
}

impl HttpJudge {
    /// Create a judge client for the given completion endpoint and model
    ///
    /// # Errors
    /// Client construction failures.
    pub fn new(
        completion_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, JudgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JudgeError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            completion_url: completion_url.into(),
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    completion: String,
}

#[async_trait]
impl Judge for HttpJudge {
    async fn complete(&self, prompt: &str) -> Result<String, JudgeError> {
        let response = self
            .client
            .post(&self.completion_url)
            .json(&CompletionRequest {
                model: &self.model,
                prompt,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    JudgeError::Timeout
                } else {
                    JudgeError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(JudgeError::Unavailable(format!(
                "judge returned HTTP {status}"
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::Unavailable(format!("malformed completion body: {e}")))?;
        Ok(body.completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoker_surfaces_connection_errors() {
        let invoker = HttpArtifactInvoker::new(Duration::from_millis(200)).unwrap();
        // Port 9 (discard) is not listening in the test environment
        let err = invoker
            .invoke("http://127.0.0.1:9/none", &serde_json::json!({"x": 1}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvokeError::Transport(_) | InvokeError::Timeout
        ));
    }

    #[tokio::test]
    async fn judge_surfaces_connection_errors() {
        let judge =
            HttpJudge::new("http://127.0.0.1:9/complete", "judge-v1", Duration::from_millis(200))
                .unwrap();
        let err = judge.complete("score this").await.unwrap_err();
        assert!(matches!(err, JudgeError::Unavailable(_) | JudgeError::Timeout));
    }
}
