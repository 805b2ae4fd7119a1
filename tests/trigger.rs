// ABOUTME: Integration tests for the trigger gate and the HTTP trigger route.
// ABOUTME: Covers drop-on-busy admission, slot sharing, and body decoding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use refit::trigger::{router, ApiState, TagOverrides, TriggerGate, UpdateFn};

/// Build an ApiState whose update fn records every tag map it receives.
fn recording_state(gate: TriggerGate) -> (Arc<ApiState>, Arc<Mutex<Vec<TagOverrides>>>) {
    let runs: Arc<Mutex<Vec<TagOverrides>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = runs.clone();
    let update: UpdateFn = Arc::new(move |tags| {
        let recorded = recorded.clone();
        Box::pin(async move {
            recorded.lock().unwrap().push(tags);
        })
    });
    (Arc::new(ApiState::new(gate, update)), runs)
}

fn trigger_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/update")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test: ten concurrent attempts admit exactly one pass, and the gate is
/// free again afterwards.
#[tokio::test]
async fn concurrent_triggers_admit_exactly_one() {
    let gate = TriggerGate::new();
    let executed = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));

    // One task takes the slot and holds it for a while.
    let holder = {
        let gate = gate.clone();
        let executed = executed.clone();
        tokio::spawn(async move {
            let _guard = gate.try_enter().expect("initial slot should be free");
            executed.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
        })
    };

    // Give the holder time to take the slot.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut attempts = Vec::new();
    for _ in 0..9 {
        let gate = gate.clone();
        let executed = executed.clone();
        let skipped = skipped.clone();
        attempts.push(tokio::spawn(async move {
            match gate.try_enter() {
                Some(_guard) => {
                    executed.fetch_add(1, Ordering::SeqCst);
                }
                None => {
                    skipped.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));
    }

    for attempt in attempts {
        attempt.await.unwrap();
    }
    holder.await.unwrap();

    assert_eq!(executed.load(Ordering::SeqCst), 1);
    assert_eq!(skipped.load(Ordering::SeqCst), 9);
    assert!(gate.try_enter().is_some(), "slot should be free again");
}

/// Test: a well-formed trigger runs a pass with the supplied tags.
#[tokio::test]
async fn trigger_runs_pass_with_supplied_tags() {
    let (state, runs) = recording_state(TriggerGate::new());
    let app = router(state);

    let response = app
        .oneshot(trigger_request(r#"{"aidriver": "v1.2", "daemon": "v3"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let runs = runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].get("aidriver"), Some(&"v1.2".to_string()));
    assert_eq!(runs[0].get("daemon"), Some(&"v3".to_string()));
}

/// Test: an empty mapping is valid and runs a pass without overrides.
#[tokio::test]
async fn trigger_accepts_empty_mapping() {
    let (state, runs) = recording_state(TriggerGate::new());
    let app = router(state);

    let response = app.oneshot(trigger_request("{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(runs.lock().unwrap().len(), 1);
}

/// Test: an undecodable body is a 400 with diagnostic text and no pass.
#[tokio::test]
async fn trigger_rejects_malformed_body() {
    let (state, runs) = recording_state(TriggerGate::new());
    let app = router(state);

    let response = app.oneshot(trigger_request("not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("failed to decode"));

    assert!(runs.lock().unwrap().is_empty());
}

/// Test: a busy gate drops the trigger with a 200 and runs nothing.
#[tokio::test]
async fn trigger_is_dropped_while_gate_is_busy() {
    let gate = TriggerGate::new();
    let (state, runs) = recording_state(gate.clone());
    let app = router(state);

    let _held = gate.try_enter().expect("slot should be free");

    let response = app.oneshot(trigger_request("{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(runs.lock().unwrap().is_empty());
}

/// Test: successive triggers each run once the previous pass finished.
#[tokio::test]
async fn sequential_triggers_all_run() {
    let (state, runs) = recording_state(TriggerGate::new());
    let app = router(state);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(trigger_request("{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(runs.lock().unwrap().len(), 3);
}
