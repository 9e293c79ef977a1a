//! HTTP surface tests — driven through the router with `tower::ServiceExt`.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::*;
use renewal_core::{
    config::RenewalConfig,
    engine::RenewalEngine,
    http::{router, AppState},
    ledger::NotificationLedger,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app(h: &Harness, staff_token: Option<&str>) -> Router {
    app_for(h.engine.clone(), staff_token)
}

fn app_for(engine: Arc<RenewalEngine>, staff_token: Option<&str>) -> Router {
    let config = RenewalConfig {
        staff_token: staff_token.map(str::to_string),
        ..RenewalConfig::default_test()
    };
    router(AppState::new(engine, &config))
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_reports_ok() {
    let h = harness(vec![]);
    let (status, body) = call(&app(&h, None), Method::GET, "/renewals/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

/// Scenario B: only the policy inside the requested window is listed.
#[tokio::test]
async fn expiring_honours_the_days_window() {
    let h = harness(vec![policy_expiring_in(1, 5), policy_expiring_in(2, 40)]);
    let (status, body) =
        call(&app(&h, None), Method::GET, "/renewals/expiring?days=10", None).await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["policy"]["id"], 1);
    assert_eq!(data[0]["daysToExpiry"], 5);
    assert_eq!(data[0]["remindersSent"], json!([]));
    assert_eq!(data[0]["pendingReminders"], json!([15, 7]));
}

#[tokio::test]
async fn malformed_days_falls_back_to_thirty() {
    let h = harness(vec![
        policy_expiring_in(1, 5),
        policy_expiring_in(2, 25),
        policy_expiring_in(3, 40),
    ]);
    let app = app(&h, None);

    for uri in ["/renewals/expiring", "/renewals/expiring?days=soon", "/renewals/expiring?days=-3"] {
        let (status, body) = call(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body["data"].as_array().unwrap().len(), 2, "{uri}");
    }
}

#[tokio::test]
async fn run_executes_one_sweep() {
    let h = harness(vec![policy_expiring_in(1, 6)]);
    let app = app(&h, None);

    let (status, body) = call(&app, Method::POST, "/renewals/run", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "processed": 2, "sent": 2 } }));

    let (_, body) = call(&app, Method::POST, "/renewals/run", None).await;
    assert_eq!(body, json!({ "data": { "processed": 0, "sent": 0 } }));
}

#[tokio::test]
async fn notify_records_the_requested_threshold() {
    let h = harness(vec![policy_expiring_in(1, 20)]);
    let app = app(&h, None);

    let (status, body) =
        call(&app, Method::POST, "/renewals/policies/1/notify?day=7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "sent": true } }));

    // Repeating the request is still a success.
    let (status, _) = call(&app, Method::POST, "/renewals/policies/1/notify?day=7", None).await;
    assert_eq!(status, StatusCode::OK);

    let days: Vec<_> = h.ledger.records_for(1).unwrap().iter().map(|r| r.reminder_day).collect();
    assert_eq!(days, vec![7]);
}

#[tokio::test]
async fn malformed_day_uses_the_automatic_threshold() {
    let h = harness(vec![policy_expiring_in(1, 6)]);
    let (status, _) = call(
        &app(&h, None),
        Method::POST,
        "/renewals/policies/1/notify?day=tomorrow",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.dispatcher.sends(), vec![(1, 7)]);
}

#[tokio::test]
async fn notify_unknown_policy_is_a_client_error() {
    let h = harness(vec![policy_expiring_in(1, 6)]);
    let app = app(&h, None);

    for uri in ["/renewals/policies/42/notify", "/renewals/policies/abc/notify"] {
        let (status, body) = call(&app, Method::POST, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert!(body["error"].as_str().unwrap().contains("not found"), "{uri}");
    }
}

#[tokio::test]
async fn failed_manual_dispatch_is_a_bad_gateway() {
    let h = harness(vec![policy_expiring_in(1, 6)]);
    h.dispatcher.fail_for(1);
    let (status, body) =
        call(&app(&h, None), Method::POST, "/renewals/policies/1/notify", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].is_string());
    assert!(h.ledger.is_empty());
}

#[tokio::test]
async fn staff_routes_require_the_configured_token() {
    let h = harness(vec![policy_expiring_in(1, 6)]);
    let app = app(&h, Some("s3cret"));

    let (status, body) = call(&app, Method::GET, "/renewals/expiring", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "staff authorization required" }));

    for wrong in ["wrong", "s3creT", "s3cre", "s3cret2"] {
        let (status, _) = call(&app, Method::POST, "/renewals/run", Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {wrong:?}");
    }
    assert!(h.dispatcher.sends().is_empty());

    let (status, _) = call(&app, Method::GET, "/renewals/expiring", Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, Method::GET, "/renewals/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ledger_write_failure_fails_the_run_with_500() {
    let (engine, dispatcher) = engine_with_ledger(
        vec![policy_expiring_in(1, 10)],
        Arc::new(DownLedger { reads_fail: false }),
    );
    let (status, body) = call(&app_for(engine, None), Method::POST, "/renewals/run", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("ledger database unreachable"));
    assert_eq!(dispatcher.sends(), vec![(1, 15)]);
}

#[tokio::test]
async fn ledger_read_failure_fails_expiring_and_run_with_500() {
    let (engine, dispatcher) = engine_with_ledger(
        vec![policy_expiring_in(1, 10)],
        Arc::new(DownLedger { reads_fail: true }),
    );
    let app = app_for(engine, None);

    let (status, body) = call(&app, Method::GET, "/renewals/expiring", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(body.get("data").is_none());

    let (status, body) = call(&app, Method::POST, "/renewals/run", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(dispatcher.sends().is_empty());
}
