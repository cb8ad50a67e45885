//! Integration tests for the Benefit Service
//!
//! These tests drive the full ledger flow through the HTTP router.
//!
//! Requirements:
//! - Redis running on localhost:6379
//! - Run with: cargo test --package benefit-service -- --ignored

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use benefit_service::{create_router, AppState, Ledger, Notifier, Storage};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

async fn create_test_app() -> Router {
    let storage = Storage::new("redis://localhost:6379")
        .await
        .expect("Failed to connect to Redis");

    let state = AppState {
        ledger: Mutex::new(Ledger::new(storage, Notifier::new(None))),
    };

    create_router(state)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    actor_id: &str,
    role: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-actor-id", actor_id)
        .header("x-actor-role", role);

    let request = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            builder.body(Body::from(json.to_string())).unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

/// Enroll a beneficiary whose registration was 60 days after the LMP, so
/// installment 1 is eligible from the start.
async fn enroll_timely_beneficiary(app: &Router) -> String {
    let beneficiary_id = format!("test-{}", Uuid::new_v4());

    let (status, body) = send(
        app,
        Method::POST,
        "/api/beneficiaries",
        "test-caseworker",
        "caseworker",
        Some(json!({
            "beneficiary_id": beneficiary_id,
            "name": "Asha Devi",
            "phone": "9876543210",
            "village": "Rampur",
            "lmp_date": "2024-01-10",
            "registration_date": "2024-03-10"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "enroll failed: {}", body);
    assert_eq!(body["installments"][0]["status"], "eligible");
    assert_eq!(body["installments"][1]["status"], "locked");
    assert_eq!(body["installments"][2]["status"], "locked");

    beneficiary_id
}

fn bank_details() -> Value {
    json!({
        "ordinal": 1,
        "account_holder": "Asha Devi",
        "account_number": "12345678",
        "confirm_account_number": "12345678",
        "ifsc_code": "SBIN0001234",
        "bank_name": "State Bank of India"
    })
}

#[tokio::test]
#[ignore] // Requires Redis to be running
async fn test_full_installment_lifecycle() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    // Summary shows the eligible first installment and no payment details
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/benefits/summary",
        &beneficiary_id,
        "beneficiary",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_eligible_paise"], 100_000);
    assert_eq!(body["total_paid_paise"], 0);
    assert!(body.get("payment_details").is_none() || body["payment_details"].is_null());

    // Apply for installment 1 with bank details
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(bank_details()),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "apply failed: {}", body);
    assert_eq!(body["status"], "application_submitted");

    // The application appears in the caseworker queue with full details
    let (status, body) = send(
        &app,
        Method::GET,
        "/api/caseworker/applications",
        "test-caseworker",
        "caseworker",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entry = body
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["beneficiary_id"] == beneficiary_id.as_str())
        .expect("application missing from pending queue");
    assert_eq!(entry["ordinal"], 1);
    assert_eq!(entry["amount_paise"], 100_000);
    assert_eq!(entry["payment_details"]["account_number"], "12345678");

    // Approve, then record the disbursement transaction
    let approve_uri = format!(
        "/api/caseworker/applications/{}/1/approve",
        beneficiary_id
    );
    let (status, body) = send(
        &app,
        Method::POST,
        &approve_uri,
        "test-caseworker",
        "caseworker",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "approve failed: {}", body);
    assert_eq!(body["status"], "approved");

    let pay_uri = format!("/api/caseworker/applications/{}/1/pay", beneficiary_id);
    let (status, body) = send(
        &app,
        Method::POST,
        &pay_uri,
        "test-caseworker",
        "caseworker",
        Some(json!({ "transaction_id": "TXN-0001" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "pay failed: {}", body);
    assert_eq!(body["status"], "paid");

    // An ANC visit unlocks installment 2 now that installment 1 is paid
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/events",
        "test-caseworker",
        "caseworker",
        Some(json!({
            "beneficiary_id": beneficiary_id,
            "event_type": "anc_visit",
            "visit_date": "2024-05-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unlocked"], json!([2]));

    // Second application needs no bank details; stored ones are reused and
    // the summary masks the account number.
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(json!({ "ordinal": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "second apply failed: {}", body);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/benefits/summary",
        &beneficiary_id,
        "beneficiary",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_paid_paise"], 100_000);
    assert_eq!(body["payment_details"]["account_number"], "XXXX5678");
    assert_eq!(body["installments"][0]["transaction_id"], "TXN-0001");
}

#[tokio::test]
#[ignore]
async fn test_summary_before_enrollment_is_not_found() {
    let app = create_test_app().await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/benefits/summary",
        &format!("missing-{}", Uuid::new_v4()),
        "beneficiary",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
#[ignore]
async fn test_mismatched_account_confirmation_rejected() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    let mut payload = bank_details();
    payload["confirm_account_number"] = json!("12345679");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["field"], "confirm_account_number");

    // No application was created and the installment is still eligible
    let (_, summary) = send(
        &app,
        Method::GET,
        "/api/benefits/summary",
        &beneficiary_id,
        "beneficiary",
        None,
    )
    .await;
    assert_eq!(summary["installments"][0]["status"], "eligible");

    let (_, pending) = send(
        &app,
        Method::GET,
        "/api/caseworker/applications",
        "test-caseworker",
        "caseworker",
        None,
    )
    .await;
    assert!(pending
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["beneficiary_id"] != beneficiary_id.as_str()));
}

#[tokio::test]
#[ignore]
async fn test_bad_ifsc_rejected() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    let mut payload = bank_details();
    payload["ifsc_code"] = json!("SBI0001234");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "ifsc_code");
}

#[tokio::test]
#[ignore]
async fn test_mark_paid_before_submission_is_a_state_error() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    // Installment 1 is eligible but never submitted
    let pay_uri = format!("/api/caseworker/applications/{}/1/pay", beneficiary_id);
    let (status, body) = send(
        &app,
        Method::POST,
        &pay_uri,
        "test-caseworker",
        "caseworker",
        Some(json!({ "transaction_id": "TXN-0002" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "state_error");

    // No side effects
    let (_, summary) = send(
        &app,
        Method::GET,
        "/api/benefits/summary",
        &beneficiary_id,
        "beneficiary",
        None,
    )
    .await;
    assert_eq!(summary["installments"][0]["status"], "eligible");
    assert_eq!(summary["total_paid_paise"], 0);
}

#[tokio::test]
#[ignore]
async fn test_double_apply_only_succeeds_once() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    let (first, _) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(bank_details()),
    )
    .await;
    assert_eq!(first, StatusCode::OK);

    // The losing apply sees the already-submitted installment. The
    // storage-level CAS test covers the same race at the write itself.
    let (second, body) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(bank_details()),
    )
    .await;
    assert_eq!(second, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "state_error");
}

#[tokio::test]
#[ignore]
async fn test_rejection_returns_installment_to_eligible() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(bank_details()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let reject_uri = format!(
        "/api/caseworker/applications/{}/1/reject",
        beneficiary_id
    );
    let (status, body) = send(
        &app,
        Method::POST,
        &reject_uri,
        "test-caseworker",
        "caseworker",
        Some(json!({ "review_notes": "account holder name does not match records" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "reject failed: {}", body);
    assert_eq!(body["status"], "eligible");

    // Bank details from the rejected application are retained, so the
    // second attempt does not need to resubmit them.
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/benefits/apply",
        &beneficiary_id,
        "beneficiary",
        Some(json!({ "ordinal": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_out_of_order_birth_event_unlocks_nothing() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    // Birth recorded while installment 1 is still unpaid
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/events",
        "test-caseworker",
        "caseworker",
        Some(json!({
            "beneficiary_id": beneficiary_id,
            "event_type": "birth",
            "birth_date": "2024-10-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unlocked"], json!([]));

    let (_, summary) = send(
        &app,
        Method::GET,
        "/api/benefits/summary",
        &beneficiary_id,
        "beneficiary",
        None,
    )
    .await;
    assert_eq!(summary["installments"][1]["status"], "locked");
    assert_eq!(summary["installments"][2]["status"], "locked");
}

#[tokio::test]
#[ignore]
async fn test_caseworker_routes_require_the_role() {
    let app = create_test_app().await;
    let beneficiary_id = enroll_timely_beneficiary(&app).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/caseworker/applications",
        &beneficiary_id,
        "beneficiary",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/benefits/summary")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
