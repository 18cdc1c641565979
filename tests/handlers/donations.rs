//! Tests for the POST /donations endpoint.
//!
//! The checkout widget posts the confirmation here synchronously; the
//! payload carries the same integrity signature as a webhook.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

#[path = "../common/mod.rs"]
mod common;
use common::*;

async fn post_donation(app: &Router, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/donations")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).expect("Response should be valid JSON");
    (status, json)
}

fn donation_body(reference: &str, amount_in_cents: i64, status: &str) -> Value {
    json!({
        "reference": reference,
        "amountInCents": amount_in_cents,
        "currency": "COP",
        "signature": sign(reference, amount_in_cents, "COP"),
        "status": status,
        "transaction_id": "tx-don-1",
        "customerData": { "id": "42" },
        "paymentMethodType": "NEQUI"
    })
}

#[tokio::test]
async fn test_valid_donation_saved_with_envelope() {
    let state = create_test_app_state();
    let app = api_app(state.clone());

    let (status, json) = post_donation(&app, &donation_body("don_500", 250000, "APPROVED")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Datos guardados correctamente.");
    assert!(json["error"].is_null());

    // Both rows come back in the envelope
    assert_eq!(json["data"]["payment"]["reference"], "don_500");
    assert_eq!(json["data"]["payment"]["amount"], 2500.0);
    assert_eq!(json["data"]["payment"]["payment_status"], "APPROVED");
    // The string customer id is coerced
    assert_eq!(json["data"]["payment"]["user_id"], 42);
    assert_eq!(json["data"]["donation"]["payment_id"], "don_500");
    assert_eq!(json["data"]["donation"]["sponsor_id"], 42);
    assert_eq!(json["data"]["donation"]["message"], "Donation via nequi");

    let conn = state.db.get().unwrap();
    assert_eq!(
        queries::list_donations_by_payment(&conn, "don_500").unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_declined_donation_recorded_with_its_status() {
    let state = create_test_app_state();
    let app = api_app(state.clone());

    let (status, json) = post_donation(&app, &donation_body("don_501", 80000, "DECLINED")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["payment"]["payment_status"], "DECLINED");

    let conn = state.db.get().unwrap();
    let payment = queries::get_payment_by_reference(&conn, "don_501")
        .unwrap()
        .expect("Declined donations are recorded too");
    assert_eq!(payment.payment_status, PaymentStatus::Declined);
}

#[tokio::test]
async fn test_invalid_signature_rejected_without_rows() {
    let state = create_test_app_state();
    let app = api_app(state.clone());

    let mut body = donation_body("don_502", 80000, "APPROVED");
    body["signature"] = json!(sign("don_502", 80001, "COP"));

    let (status, json) = post_donation(&app, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Firma inválida.");

    let conn = state.db.get().unwrap();
    assert!(queries::get_payment_by_reference(&conn, "don_502")
        .unwrap()
        .is_none());
    assert!(queries::list_donations_by_payment(&conn, "don_502")
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_missing_required_field_rejected() {
    let app = api_app(create_test_app_state());

    let body = json!({
        "reference": "don_503",
        "currency": "COP",
        "signature": "irrelevant"
    });
    let (status, json) = post_donation(&app, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Datos incompletos en la solicitud.");
}

#[tokio::test]
async fn test_unknown_status_recorded_as_error() {
    let state = create_test_app_state();
    let app = api_app(state.clone());

    let (status, json) = post_donation(&app, &donation_body("don_504", 80000, "EXPLODED")).await;

    // The event is kept rather than rejected
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["payment"]["payment_status"], "ERROR");

    let conn = state.db.get().unwrap();
    let payment = queries::get_payment_by_reference(&conn, "don_504")
        .unwrap()
        .expect("Payment should exist");
    assert_eq!(payment.payment_status, PaymentStatus::Error);
}

#[tokio::test]
async fn test_duplicate_reference_fails_without_second_donation() {
    let state = create_test_app_state();
    let app = api_app(state.clone());

    let body = donation_body("don_505", 80000, "APPROVED");
    let (first, _) = post_donation(&app, &body).await;
    assert_eq!(first, StatusCode::OK);

    let (second, json) = post_donation(&app, &body).await;
    assert_eq!(second, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);

    let conn = state.db.get().unwrap();
    assert_eq!(
        queries::list_donations_by_payment(&conn, "don_505").unwrap().len(),
        1,
        "The failed replay must not add a donation"
    );
}
