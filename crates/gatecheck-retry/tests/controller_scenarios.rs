//! Retry controller scenarios: dispatch, exhaustion, chain collapse,
//! idempotency

use gatecheck_retry::{
    NotifyKind, Resolution, RetryController, RunVerdict,
};
use gatecheck_test_utils::{
    seed_attempt, FailingDispatcher, MemoryStore, RecordingDispatcher, RecordingLessonSink,
    RecordingNotifier,
};
use gatecheck_types::{
    BuildId, BuildStatus, FailureContext, QaSummary, RetryConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn failing_verdict() -> RunVerdict {
    RunVerdict::Failed {
        failure: FailureContext {
            contract_issues: vec!["weather: Needs 2+ example inputs, found 0".to_string()],
            ..FailureContext::default()
        },
    }
}

fn passing_verdict() -> RunVerdict {
    RunVerdict::Passed {
        summary: QaSummary {
            artifacts: vec![("weather".to_string(), 2, 2)],
            fidelity_reasoning: "matches the request".to_string(),
            ux_mean: 7.7,
        },
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    dispatcher: Arc<RecordingDispatcher>,
    notifier: Arc<RecordingNotifier>,
    controller: RetryController,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = RetryController::new(
        Arc::clone(&store) as Arc<dyn gatecheck_retry::AttemptStore>,
        Arc::clone(&dispatcher) as Arc<dyn gatecheck_retry::RebuildDispatcher>,
        Arc::clone(&notifier) as Arc<dyn gatecheck_retry::Notifier>,
        RetryConfig::default(),
    );
    Harness {
        store,
        dispatcher,
        notifier,
        controller,
    }
}

#[tokio::test]
async fn failure_with_budget_dispatches_rebuild() {
    let h = harness();
    seed_attempt(&h.store, "b1", 1, None, BuildStatus::Running);

    let resolution = h
        .controller
        .resolve(&BuildId::from("b1"), failing_verdict())
        .await
        .unwrap();

    match resolution {
        Resolution::RetryDispatched { child, next_cycle } => {
            assert_eq!(child, BuildId::from("retry-1"));
            assert_eq!(next_cycle, 2);
        }
        other => panic!("expected dispatch, got {other:?}"),
    }

    // Attempt persisted as retrying with the feedback attached
    let attempt = h.store.snapshot(&BuildId::from("b1")).unwrap();
    assert_eq!(attempt.status, BuildStatus::Retrying);
    let context = attempt.failure_context.unwrap();
    assert_eq!(context.contract_issues.len(), 1);

    // Dispatch carried the original request, feedback, and parent link
    let calls = h.dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].cycle, 2);
    assert_eq!(calls[0].parent_build_id, BuildId::from("b1"));
    assert!(calls[0].request.contains("weather lookup"));
    assert_eq!(calls[0].failure.contract_issues.len(), 1);

    // User sees a still-working signal, not failure detail
    let events = h.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, NotifyKind::BuildRetrying);
    assert!(events[0].message.contains("Still working"));
    assert!(!events[0].message.contains("Needs 2+"));
}

#[tokio::test]
async fn exhausted_budget_escalates_not_retries() {
    let h = harness();
    // cycle equals the default budget of 5
    seed_attempt(&h.store, "b5", 5, Some("b4"), BuildStatus::Running);

    let resolution = h
        .controller
        .resolve(&BuildId::from("b5"), failing_verdict())
        .await
        .unwrap();

    assert_eq!(resolution, Resolution::Escalated);
    assert!(h.dispatcher.calls().is_empty());

    let attempt = h.store.snapshot(&BuildId::from("b5")).unwrap();
    assert_eq!(attempt.status, BuildStatus::NeedsHelp);

    let events = h.notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, NotifyKind::NeedsHelp);
    // Prioritized summary leads with the contract issues
    assert!(events[0].message.contains("interface declaration"));
}

#[tokio::test]
async fn success_collapses_whole_chain() {
    let h = harness();
    seed_attempt(&h.store, "a", 1, None, BuildStatus::Retrying);
    seed_attempt(&h.store, "b", 2, Some("a"), BuildStatus::Retrying);
    seed_attempt(&h.store, "c", 3, Some("b"), BuildStatus::Running);

    let resolution = h
        .controller
        .resolve(&BuildId::from("c"), passing_verdict())
        .await
        .unwrap();

    match resolution {
        Resolution::Completed { resolved_ancestors } => {
            assert_eq!(resolved_ancestors, vec![BuildId::from("b"), BuildId::from("a")]);
        }
        other => panic!("expected completion, got {other:?}"),
    }

    for id in ["a", "b"] {
        let ancestor = h.store.snapshot(&BuildId::from(id)).unwrap();
        assert_eq!(ancestor.status, BuildStatus::Completed, "ancestor {id}");
        assert_eq!(ancestor.resolved_by, Some(BuildId::from("c")), "ancestor {id}");
    }

    let resolved = h.store.snapshot(&BuildId::from("c")).unwrap();
    assert_eq!(resolved.status, BuildStatus::Completed);
    assert!(resolved.qa_summary.is_some());
    // Audit recorded the terminal transition plus both ancestor closures
    assert_eq!(h.controller.audit().entries().len(), 3);
    assert!(h.controller.audit().verify_integrity().is_ok());
}

#[tokio::test]
async fn chain_walk_stops_at_missing_ancestor() {
    let h = harness();
    seed_attempt(&h.store, "b", 2, Some("ghost"), BuildStatus::Running);

    let resolution = h
        .controller
        .resolve(&BuildId::from("b"), passing_verdict())
        .await
        .unwrap();

    // Missing ancestor is logged and tolerated, never raised
    assert_eq!(
        resolution,
        Resolution::Completed {
            resolved_ancestors: vec![]
        }
    );
    let attempt = h.store.snapshot(&BuildId::from("b")).unwrap();
    assert_eq!(attempt.status, BuildStatus::Completed);
}

#[tokio::test]
async fn chain_walk_stops_at_already_resolved_ancestor() {
    let h = harness();
    seed_attempt(&h.store, "a", 1, None, BuildStatus::NeedsHelp);
    seed_attempt(&h.store, "b", 2, Some("a"), BuildStatus::Running);

    let resolution = h
        .controller
        .resolve(&BuildId::from("b"), passing_verdict())
        .await
        .unwrap();

    assert_eq!(
        resolution,
        Resolution::Completed {
            resolved_ancestors: vec![]
        }
    );
    // The resolved ancestor is left untouched
    let ancestor = h.store.snapshot(&BuildId::from("a")).unwrap();
    assert_eq!(ancestor.status, BuildStatus::NeedsHelp);
    assert!(ancestor.resolved_by.is_none());
}

#[tokio::test]
async fn duplicate_resolution_is_a_noop() {
    let h = harness();
    seed_attempt(&h.store, "b1", 1, None, BuildStatus::Running);

    let first = h
        .controller
        .resolve(&BuildId::from("b1"), passing_verdict())
        .await
        .unwrap();
    assert!(matches!(first, Resolution::Completed { .. }));

    let second = h
        .controller
        .resolve(&BuildId::from("b1"), passing_verdict())
        .await
        .unwrap();
    assert_eq!(second, Resolution::AlreadyResolved);

    // No duplicate notification, no second audit entry
    assert_eq!(h.notifier.events().len(), 1);
    assert_eq!(h.controller.audit().entries().len(), 1);
}

#[tokio::test]
async fn duplicate_signal_while_retrying_is_a_noop() {
    let h = harness();
    seed_attempt(&h.store, "b1", 1, None, BuildStatus::Running);

    h.controller
        .resolve(&BuildId::from("b1"), failing_verdict())
        .await
        .unwrap();
    let second = h
        .controller
        .resolve(&BuildId::from("b1"), failing_verdict())
        .await
        .unwrap();

    assert_eq!(second, Resolution::AlreadyResolved);
    assert_eq!(h.dispatcher.calls().len(), 1);
}

#[tokio::test]
async fn dispatch_failure_escalates_immediately() {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let controller = RetryController::new(
        Arc::clone(&store) as Arc<dyn gatecheck_retry::AttemptStore>,
        Arc::new(FailingDispatcher::new("generator queue is gone")),
        Arc::clone(&notifier) as Arc<dyn gatecheck_retry::Notifier>,
        RetryConfig::default(),
    );
    seed_attempt(&store, "b1", 1, None, BuildStatus::Running);

    let resolution = controller
        .resolve(&BuildId::from("b1"), failing_verdict())
        .await
        .unwrap();

    // Cycle budget had room, but a dispatch failure bypasses it
    assert_eq!(resolution, Resolution::Escalated);
    let attempt = store.snapshot(&BuildId::from("b1")).unwrap();
    assert_eq!(attempt.status, BuildStatus::NeedsHelp);

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, NotifyKind::NeedsHelp);
}

#[tokio::test]
async fn unknown_attempt_is_an_error() {
    let h = harness();
    let err = h
        .controller
        .resolve(&BuildId::from("nope"), passing_verdict())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("attempt not found"));
}

#[tokio::test]
async fn lessons_extracted_on_success_only() {
    let h = harness();
    let lessons = Arc::new(RecordingLessonSink::new());
    let controller = h.controller.clone().with_lesson_sink(Arc::clone(&lessons) as Arc<dyn gatecheck_retry::LessonSink>);

    seed_attempt(&h.store, "b1", 1, None, BuildStatus::Running);
    controller
        .resolve(&BuildId::from("b1"), passing_verdict())
        .await
        .unwrap();

    // Extraction runs detached; give it a beat to land
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(lessons.extracted(), vec![BuildId::from("b1")]);

    seed_attempt(&h.store, "b2", 1, None, BuildStatus::Running);
    controller
        .resolve(&BuildId::from("b2"), failing_verdict())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(lessons.extracted().len(), 1);
}
