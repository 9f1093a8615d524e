//! End-to-end tests of the HTTP surface over the in-memory backend and the
//! in-process payment processor.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use zap_api::auth::issue_token;
use zap_api::config::AppConfig;
use zap_api::state::AppState;
use zap_core::Email;
use zap_dispatch::testing::FakeProcessor;
use zap_dispatch::PaymentProcessor;

const SECRET: &str = "integration-secret";
const ADMIN: &str = "ops@example.com";
const SENDER: &str = "sender@example.com";
const RIDER: &str = "rita@example.com";

struct TestApp {
    router: Router,
    processor: Arc<FakeProcessor>,
}

async fn authed_app() -> TestApp {
    let config = AppConfig {
        jwt_secret: Some(SECRET.to_string()),
        admin_emails: vec![Email::new(ADMIN).unwrap()],
        ..Default::default()
    };
    let processor = Arc::new(FakeProcessor::new());
    let state = AppState::in_memory(config, Some(processor.clone() as Arc<dyn PaymentProcessor>));
    state.seed_admins().await.unwrap();
    TestApp {
        router: zap_api::app(state),
        processor,
    }
}

fn token(email: &str) -> String {
    issue_token(&Email::new(email).unwrap(), SECRET, chrono::Duration::hours(1)).unwrap()
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(email) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(email)));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

async fn create_parcel(app: &TestApp, cost: i64) -> Value {
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/v1/parcels",
        Some(SENDER),
        Some(json!({
            "senderName": "Sam Sender",
            "parcelName": "Books",
            "cost": cost,
            "details": { "receiverDistrict": "Dhaka" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["parcel"].clone()
}

/// Open a checkout, settle it at the processor, and confirm it.
async fn pay(app: &TestApp, parcel_id: &str, transaction_id: &str) -> String {
    let (status, link) = send(
        &app.router,
        Method::POST,
        "/v1/payments/checkout-session",
        Some(SENDER),
        Some(json!({ "parcelId": parcel_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{link}");
    let session_id = link["sessionId"].as_str().unwrap().to_string();
    app.processor.pay(&session_id, transaction_id);

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/payments/confirm?session_id={session_id}"),
        Some(SENDER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["outcome"], "confirmed");
    session_id
}

/// File and approve a rider application; returns the rider id.
async fn approved_rider(app: &TestApp, email: &str) -> String {
    let (status, rider) = send(
        &app.router,
        Method::POST,
        "/v1/riders",
        Some(email),
        Some(json!({ "name": "Rita Rider", "district": "Dhaka" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{rider}");
    let rider_id = rider["id"].as_str().unwrap().to_string();

    let (status, reviewed) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/riders/{rider_id}/review"),
        Some(ADMIN),
        Some(json!({ "decision": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{reviewed}");
    assert_eq!(reviewed["status"], "approved");
    rider_id
}

async fn assign(app: &TestApp, parcel_id: &str, rider_id: &str) -> (StatusCode, Value) {
    send(
        &app.router,
        Method::PATCH,
        &format!("/v1/parcels/{parcel_id}/assign"),
        Some(ADMIN),
        Some(json!({ "riderId": rider_id })),
    )
    .await
}

// ── Full delivery ───────────────────────────────────────────────────────────

#[tokio::test]
async fn parcel_travels_from_creation_to_delivery() {
    let app = authed_app().await;

    let parcel = create_parcel(&app, 500).await;
    let parcel_id = parcel["id"].as_str().unwrap();
    let tracking_id = parcel["trackingId"].as_str().unwrap();
    assert_eq!(parcel["deliveryStatus"], "parcel-created");
    assert_eq!(parcel["senderEmail"], SENDER);

    pay(&app, parcel_id, "pi_flow").await;
    let rider_id = approved_rider(&app, RIDER).await;

    let (status, assigned) = assign(&app, parcel_id, &rider_id).await;
    assert_eq!(status, StatusCode::OK, "{assigned}");
    assert_eq!(assigned["parcel"]["deliveryStatus"], "driver-assigned");
    assert_eq!(assigned["parcel"]["riderEmail"], RIDER);
    assert_eq!(assigned["ledger"], "inserted");

    for next in ["rider-arriving", "parcel-delivered"] {
        let (status, body) = send(
            &app.router,
            Method::PATCH,
            &format!("/v1/parcels/{parcel_id}/status"),
            Some(RIDER),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["parcel"]["deliveryStatus"], next);
    }

    let (status, logs) = send(
        &app.router,
        Method::GET,
        &format!("/v1/trackings/{tracking_id}/logs"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        statuses,
        [
            "parcel-created",
            "pending-pickup",
            "driver-assigned",
            "rider-arriving",
            "parcel-delivered"
        ]
    );
}

#[tokio::test]
async fn confirming_twice_reports_already_processed() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 120).await;
    let parcel_id = parcel["id"].as_str().unwrap();
    let session_id = pay(&app, parcel_id, "pi_twice").await;

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/payments/confirm?session_id={session_id}"),
        Some(SENDER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "alreadyProcessed");
    assert_eq!(body["transactionId"], "pi_twice");
    assert_eq!(body["trackingId"], parcel["trackingId"]);
}

#[tokio::test]
async fn unpaid_session_confirms_as_not_paid() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 80).await;
    let (_, link) = send(
        &app.router,
        Method::POST,
        "/v1/payments/checkout-session",
        Some(SENDER),
        Some(json!({ "parcelId": parcel["id"] })),
    )
    .await;
    let session_id = link["sessionId"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/payments/confirm?session_id={session_id}"),
        Some(SENDER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "notPaid");
    assert_eq!(body["sessionId"], session_id);
}

#[tokio::test]
async fn rider_rejection_returns_parcel_to_pool() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 300).await;
    let parcel_id = parcel["id"].as_str().unwrap();
    pay(&app, parcel_id, "pi_reject").await;
    let rider_id = approved_rider(&app, RIDER).await;
    assign(&app, parcel_id, &rider_id).await;

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/parcels/{parcel_id}/reject"),
        Some(RIDER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["parcel"]["deliveryStatus"], "pending-pickup");
    assert!(body["parcel"]["riderId"].is_null());

    // Freed rider can take the parcel again under the strict policy.
    let (status, _) = assign(&app, parcel_id, &rider_id).await;
    assert_eq!(status, StatusCode::OK);
}

// ── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn registering_is_idempotent() {
    let app = authed_app().await;
    let body = json!({ "displayName": "Sam Sender" });

    let (first, user) = send(&app.router, Method::POST, "/v1/users", Some(SENDER), Some(body.clone())).await;
    assert_eq!(first, StatusCode::CREATED);
    assert_eq!(user["role"], "user");

    let (second, _) = send(&app.router, Method::POST, "/v1/users", Some(SENDER), Some(body)).await;
    assert_eq!(second, StatusCode::OK);
}

#[tokio::test]
async fn seeded_admin_and_unknown_user_roles() {
    let app = authed_app().await;

    let (status, body) = send(&app.router, Method::GET, &format!("/v1/users/{ADMIN}/role"), Some(SENDER), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    let (_, body) = send(
        &app.router,
        Method::GET,
        "/v1/users/nobody@example.com/role",
        Some(SENDER),
        None,
    )
    .await;
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn only_admins_set_roles() {
    let app = authed_app().await;
    send(
        &app.router,
        Method::POST,
        "/v1/users",
        Some(SENDER),
        Some(json!({ "displayName": "Sam" })),
    )
    .await;

    let uri = format!("/v1/users/{SENDER}/role");
    let (status, _) = send(&app.router, Method::PATCH, &uri, Some(SENDER), Some(json!({ "role": "admin" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app.router, Method::PATCH, &uri, Some(ADMIN), Some(json!({ "role": "rider" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "rider");

    let (status, _) = send(&app.router, Method::PATCH, &uri, Some(ADMIN), Some(json!({ "role": "pilot" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Authorization and errors ────────────────────────────────────────────────

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() {
    let app = authed_app().await;
    let (status, body) = send(&app.router, Method::GET, "/v1/parcels/00000000-0000-0000-0000-000000000000", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri("/v1/parcels/00000000-0000-0000-0000-000000000000")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn plain_users_cannot_dispatch() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 200).await;
    let parcel_id = parcel["id"].as_str().unwrap();
    pay(&app, parcel_id, "pi_forbidden").await;
    let rider_id = approved_rider(&app, RIDER).await;

    let (status, _) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/parcels/{parcel_id}/assign"),
        Some(SENDER),
        Some(json!({ "riderId": rider_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/parcels/{parcel_id}/status"),
        Some(SENDER),
        Some(json!({ "status": "rider-arriving" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn another_rider_cannot_act_on_the_parcel() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 200).await;
    let parcel_id = parcel["id"].as_str().unwrap();
    pay(&app, parcel_id, "pi_other").await;
    let rider_id = approved_rider(&app, RIDER).await;
    approved_rider(&app, "otto@example.com").await;
    assign(&app, parcel_id, &rider_id).await;

    let (status, body) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/parcels/{parcel_id}/reject"),
        Some("otto@example.com"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}

#[tokio::test]
async fn busy_rider_is_a_conflict_under_strict_policy() {
    let app = authed_app().await;
    let rider_id = approved_rider(&app, RIDER).await;

    let first = create_parcel(&app, 100).await;
    let second = create_parcel(&app, 100).await;
    pay(&app, first["id"].as_str().unwrap(), "pi_first").await;
    pay(&app, second["id"].as_str().unwrap(), "pi_second").await;

    let (status, _) = assign(&app, first["id"].as_str().unwrap(), &rider_id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = assign(&app, second["id"].as_str().unwrap(), &rider_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, unchanged) = send(
        &app.router,
        Method::GET,
        &format!("/v1/parcels/{}", second["id"].as_str().unwrap()),
        Some(SENDER),
        None,
    )
    .await;
    assert_eq!(unchanged["deliveryStatus"], "pending-pickup");
}

#[tokio::test]
async fn unknown_status_is_unprocessable_and_backwards_is_conflict() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 200).await;
    let parcel_id = parcel["id"].as_str().unwrap();
    pay(&app, parcel_id, "pi_status").await;
    let rider_id = approved_rider(&app, RIDER).await;
    assign(&app, parcel_id, &rider_id).await;
    let uri = format!("/v1/parcels/{parcel_id}/status");

    let (status, _) = send(&app.router, Method::PATCH, &uri, Some(RIDER), Some(json!({ "status": "teleported" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app.router, Method::PATCH, &uri, Some(RIDER), Some(json!({ "status": "in-transit" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, Method::PATCH, &uri, Some(RIDER), Some(json!({ "status": "rider-arriving" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let app = authed_app().await;

    let (status, _) = send(&app.router, Method::GET, "/v1/parcels/not-a-uuid", Some(SENDER), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app.router,
        Method::GET,
        "/v1/parcels/00000000-0000-0000-0000-000000000000",
        Some(SENDER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = send(&app.router, Method::GET, "/v1/trackings/bogus/logs", None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, logs) = send(&app.router, Method::GET, "/v1/trackings/zap-20250309-0A1B2C/logs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs, json!([]));
}

#[tokio::test]
async fn invalid_parcel_draft_is_rejected() {
    let app = authed_app().await;
    let (status, body) = send(
        &app.router,
        Method::POST,
        "/v1/parcels",
        Some(SENDER),
        Some(json!({ "senderName": "Sam", "parcelName": "Books", "cost": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app.router,
        Method::POST,
        "/v1/parcels",
        Some(SENDER),
        Some(json!({ "parcelName": "Books" })),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn confirm_requires_session_id() {
    let app = authed_app().await;
    let (status, body) = send(&app.router, Method::PATCH, "/v1/payments/confirm", Some(SENDER), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unreachable_processor_is_a_bad_gateway() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 50).await;
    app.processor.set_unreachable(true);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/v1/payments/checkout-session",
        Some(SENDER),
        Some(json!({ "parcelId": parcel["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["message"], "An upstream service error occurred");
}

#[tokio::test]
async fn checkout_without_processor_is_unavailable() {
    let config = AppConfig::default();
    let app = zap_api::app(AppState::in_memory(config, None));

    let (status, parcel) = send(
        &app,
        Method::POST,
        "/v1/parcels",
        None,
        Some(json!({ "senderName": "Sam", "parcelName": "Books", "cost": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/payments/checkout-session",
        None,
        Some(json!({ "parcelId": parcel["parcel"]["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
}

// ── Development mode and operational endpoints ──────────────────────────────

#[tokio::test]
async fn without_secret_every_caller_is_the_dev_admin() {
    let app = zap_api::app(AppState::in_memory(AppConfig::default(), None));

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/parcels",
        None,
        Some(json!({ "senderName": "Dev", "parcelName": "Keys", "cost": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["parcel"]["senderEmail"], zap_api::auth::DEV_ADMIN_EMAIL);
}

// ── Cancellation and removal ────────────────────────────────────────────────

#[tokio::test]
async fn sender_cancels_unpaid_parcel_but_not_a_paid_one() {
    let app = authed_app().await;
    let unpaid = create_parcel(&app, 200).await;
    let unpaid_id = unpaid["id"].as_str().unwrap();
    let uri = format!("/v1/parcels/{unpaid_id}");

    let (status, _) = send(&app.router, Method::DELETE, &uri, Some(RIDER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app.router, Method::DELETE, &uri, Some(SENDER), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["id"], unpaid["id"]);

    let (status, _) = send(&app.router, Method::GET, &uri, Some(SENDER), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let tracking_id = unpaid["trackingId"].as_str().unwrap();
    let (_, logs) = send(
        &app.router,
        Method::GET,
        &format!("/v1/trackings/{tracking_id}/logs"),
        None,
        None,
    )
    .await;
    assert_eq!(logs.as_array().unwrap().len(), 1);

    let paid = create_parcel(&app, 300).await;
    let paid_id = paid["id"].as_str().unwrap();
    pay(&app, paid_id, "pi_keep").await;
    let (status, body) = send(
        &app.router,
        Method::DELETE,
        &format!("/v1/parcels/{paid_id}"),
        Some(ADMIN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn admin_removes_rider_only_when_idle() {
    let app = authed_app().await;
    let parcel = create_parcel(&app, 500).await;
    let parcel_id = parcel["id"].as_str().unwrap();
    pay(&app, parcel_id, "pi_remove").await;
    let rider_id = approved_rider(&app, RIDER).await;
    let (status, _) = assign(&app, parcel_id, &rider_id).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/v1/riders/{rider_id}");
    let (status, _) = send(&app.router, Method::DELETE, &uri, Some(SENDER), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app.router, Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, _) = send(
        &app.router,
        Method::PATCH,
        &format!("/v1/parcels/{parcel_id}/reject"),
        Some(RIDER),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app.router, Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, role) = send(&app.router, Method::GET, &format!("/v1/users/{RIDER}/role"), Some(ADMIN), None).await;
    assert_eq!(role["role"], "user");

    let (status, _) = send(&app.router, Method::DELETE, &uri, Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_metrics_and_openapi_are_public() {
    let app = authed_app().await;

    let (status, body) = send(&app.router, Method::GET, "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));

    let (status, _) = send(&app.router, Method::GET, "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, Method::POST, "/v1/parcels", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, metrics) = send(&app.router, Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["requests"], 3);
    assert_eq!(metrics["clientErrors"], 1);
    assert_eq!(metrics["serverErrors"], 0);

    let (status, doc) = send(&app.router, Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/v1/parcels"].is_object());
    assert!(doc["paths"]["/v1/payments/confirm"].is_object());
}
