//! Testing utilities for the Gatecheck workspace
//!
//! Shared test doubles, fixtures, and seed helpers.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use gatecheck_qa::{ArtifactInvoker, InvokeError, Judge, JudgeError, ProbeError, VisualProbe};
use gatecheck_retry::{
    AttemptStore, AttemptUpdate, DispatchError, LessonError, LessonSink, Notifier, NotifyError,
    NotifyEvent, RebuildDispatcher, StoreError,
};
use gatecheck_types::{
    ArtifactDescriptor, BuildAttempt, BuildId, BuildStatus, DisplayKind, DisplaySpec,
    FailureContext, InputField, TestCase, UiContract, VisualResult,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

// ---------------------------------------------------------------------------
// Judges

/// Judge double replaying canned responses in order
#[derive(Debug, Default)]
pub struct ScriptedJudge {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedJudge {
    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(reply.into());
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn complete(&self, _prompt: &str) -> Result<String, JudgeError> {
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| JudgeError::Unavailable("script exhausted".to_string()))
    }
}

/// Judge double that always errors
#[derive(Debug)]
pub struct FailingJudge {
    message: String,
}

impl FailingJudge {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Judge for FailingJudge {
    async fn complete(&self, _prompt: &str) -> Result<String, JudgeError> {
        Err(JudgeError::Unavailable(self.message.clone()))
    }
}

// ---------------------------------------------------------------------------
// Invokers

/// Invoker double returning outputs keyed by input payload, with an
/// optional catch-all response
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    keyed: Vec<(Value, Value)>,
    fallback: Option<Value>,
}

impl ScriptedInvoker {
    pub fn with_response(response: Value) -> Self {
        Self {
            keyed: Vec::new(),
            fallback: Some(response),
        }
    }

    pub fn keyed(pairs: Vec<(Value, Value)>) -> Self {
        Self {
            keyed: pairs,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, response: Value) -> Self {
        self.fallback = Some(response);
        self
    }
}

#[async_trait]
impl ArtifactInvoker for ScriptedInvoker {
    async fn invoke(&self, _endpoint: &str, input: &Value) -> Result<Value, InvokeError> {
        if let Some((_, output)) = self.keyed.iter().find(|(k, _)| k == input) {
            return Ok(output.clone());
        }
        self.fallback
            .clone()
            .ok_or_else(|| InvokeError::Transport(format!("no scripted response for {input}")))
    }
}

/// Invoker double that fails a fixed number of times before succeeding
#[derive(Debug)]
pub struct FlakyInvoker {
    remaining_failures: AtomicU32,
    response: Value,
    error: String,
}

impl FlakyInvoker {
    pub fn new(failures: u32, response: Value) -> Self {
        Self {
            remaining_failures: AtomicU32::new(failures),
            response,
            error: "connection refused (cold start)".to_string(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }
}

#[async_trait]
impl ArtifactInvoker for FlakyInvoker {
    async fn invoke(&self, _endpoint: &str, _input: &Value) -> Result<Value, InvokeError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(InvokeError::Transport(self.error.clone()));
        }
        Ok(self.response.clone())
    }
}

// ---------------------------------------------------------------------------
// Visual probe

/// Probe double returning one canned result for every artifact
#[derive(Debug)]
pub struct ScriptedProbe {
    result: VisualResult,
}

impl ScriptedProbe {
    pub fn new(result: VisualResult) -> Self {
        Self { result }
    }
}

#[async_trait]
impl VisualProbe for ScriptedProbe {
    async fn probe(&self, _artifact_name: &str) -> Result<VisualResult, ProbeError> {
        Ok(self.result.clone())
    }
}

pub fn clean_visual_result() -> VisualResult {
    VisualResult {
        page_loaded: true,
        form_present: true,
        field_count: 1,
        example_count: 2,
        example_exercised: true,
        submission_rendered: true,
        issues: vec![],
        form_snapshot: "form: City name [text input], Try it: Oslo, Bergen".to_string(),
        result_snapshot: "cards: Oslo 21C partly cloudy".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Attempt store

/// In-memory attempt store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, BuildAttempt>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, attempt: BuildAttempt) {
        self.records
            .insert(attempt.build_id.as_str().to_string(), attempt);
    }

    pub fn snapshot(&self, build_id: &BuildId) -> Option<BuildAttempt> {
        self.records.get(build_id.as_str()).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn get(&self, build_id: &BuildId) -> Result<Option<BuildAttempt>, StoreError> {
        Ok(self.records.get(build_id.as_str()).map(|r| r.clone()))
    }

    async fn update(&self, build_id: &BuildId, update: AttemptUpdate) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(build_id.as_str())
            .ok_or_else(|| StoreError::Unavailable(format!("no record for {build_id}")))?;

        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(resolved_by) = update.resolved_by {
            record.resolved_by = Some(resolved_by);
        }
        if let Some(context) = update.failure_context {
            record.failure_context = Some(context);
        }
        if let Some(summary) = update.qa_summary {
            record.qa_summary = Some(summary);
        }
        record.updated_at = Utc::now();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifier / dispatcher / lessons

/// Notifier double recording delivered events
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifyEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotifyEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: NotifyEvent) -> Result<(), NotifyError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// One recorded rebuild dispatch
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub request: String,
    pub failure: FailureContext,
    pub cycle: u32,
    pub parent_build_id: BuildId,
}

/// Dispatcher double minting sequential child build ids
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    counter: AtomicU32,
    calls: Mutex<Vec<DispatchCall>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RebuildDispatcher for RecordingDispatcher {
    async fn invoke_rebuild(
        &self,
        original_request: &str,
        failure: &FailureContext,
        cycle: u32,
        parent_build_id: &BuildId,
    ) -> Result<BuildId, DispatchError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().push(DispatchCall {
            request: original_request.to_string(),
            failure: failure.clone(),
            cycle,
            parent_build_id: parent_build_id.clone(),
        });
        Ok(BuildId::new(format!("retry-{n}")))
    }
}

/// Dispatcher double that always errors
#[derive(Debug)]
pub struct FailingDispatcher {
    message: String,
}

impl FailingDispatcher {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl RebuildDispatcher for FailingDispatcher {
    async fn invoke_rebuild(
        &self,
        _original_request: &str,
        _failure: &FailureContext,
        _cycle: u32,
        _parent_build_id: &BuildId,
    ) -> Result<BuildId, DispatchError> {
        Err(DispatchError::Dispatch(self.message.clone()))
    }
}

/// Lesson sink double recording extraction calls
#[derive(Debug, Default)]
pub struct RecordingLessonSink {
    extracted: Mutex<Vec<BuildId>>,
}

impl RecordingLessonSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extracted(&self) -> Vec<BuildId> {
        self.extracted.lock().clone()
    }
}

#[async_trait]
impl LessonSink for RecordingLessonSink {
    async fn extract(
        &self,
        build_id: &BuildId,
        _original_request: &str,
    ) -> Result<(), LessonError> {
        self.extracted.lock().push(build_id.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures

/// Weather artifact with two tolerance-matched test cases and a valid
/// card-grid contract
pub fn weather_artifact() -> ArtifactDescriptor {
    ArtifactDescriptor::new("weather", "http://localhost:9001/weather", "City weather lookup")
        .with_schema(json!({"type": "object", "properties": {"city": {"type": "string"}}}))
        .with_contract(weather_contract())
        .with_test_case(TestCase::new(
            json!({"city": "Oslo"}),
            json!({"celsius": 20, "city": "Oslo"}),
            "Oslo current weather",
        ))
        .with_test_case(TestCase::new(
            json!({"city": "Bergen"}),
            json!({"celsius": 14, "city": "Bergen"}),
            "Bergen current weather",
        ))
}

/// Valid contract for the weather fixture
pub fn weather_contract() -> UiContract {
    UiContract::new()
        .with_display(
            DisplaySpec::new(DisplayKind::CardGrid)
                .with_summary("Weather for {city}")
                .with_icon("partly_cloudy"),
        )
        .with_example(json!({"city": "Oslo"}))
        .with_example(json!({"city": "Bergen"}))
        .with_field(InputField::new("city", "City name"))
}

/// Invoker returning in-tolerance outputs for the weather fixture
pub fn weather_invoker() -> ScriptedInvoker {
    ScriptedInvoker::keyed(vec![
        (json!({"city": "Oslo"}), json!({"celsius": 21.5, "city": "Oslo"})),
        (json!({"city": "Bergen"}), json!({"celsius": 13.0, "city": "Bergen"})),
    ])
}

/// Judge reply passing the fidelity stage
pub fn passing_fidelity_reply() -> String {
    r#"{"pass": true, "reasoning": "inputs and outputs match the request", "gaps": []}"#.to_string()
}

/// Judge reply passing the UX stage with scores 8/8/7
pub fn passing_ux_reply() -> String {
    r#"{"scores": {"discoverability": 8, "ease_of_use": 8, "result_clarity": 7},
        "critique": "clear first-run experience", "suggestions": []}"#
        .to_string()
}

/// Seed a running attempt into a store
pub fn seed_attempt(
    store: &MemoryStore,
    build_id: &str,
    cycle: u32,
    parent: Option<&str>,
    status: BuildStatus,
) -> BuildAttempt {
    let mut attempt = BuildAttempt::new(
        BuildId::from(build_id),
        "I want a weather lookup for Norwegian cities",
        "org-1",
        "user-1",
    )
    .with_cycle(cycle)
    .with_status(status);
    if let Some(parent) = parent {
        attempt = attempt.with_parent(BuildId::from(parent));
    }
    store.insert(attempt.clone());
    attempt
}
