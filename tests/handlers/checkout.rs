//! Tests for the POST /checkout/signature endpoint.
//!
//! The response is a bare `{signature}` object, not the envelope: the
//! checkout widget reads the field directly.

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

async fn post_signature(app: &Router, body: &Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/checkout/signature")
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

#[tokio::test]
async fn test_signature_endpoint_returns_bare_signature() {
    let app = api_app(create_test_app_state());

    let body = json!({
        "reference": "sub_7",
        "amountInCents": 150000,
        "currency": "COP"
    });
    let (status, json) = post_signature(&app, &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["signature"].as_str().expect("signature should be a string"),
        sign("sub_7", 150000, "COP"),
        "The endpoint must produce the gateway's integrity signature"
    );
    assert_eq!(
        json.as_object().unwrap().len(),
        1,
        "The widget expects a bare object with only the signature"
    );
}

#[tokio::test]
async fn test_signature_is_stable_across_requests() {
    let app = api_app(create_test_app_state());

    let body = json!({
        "reference": "don_1",
        "amountInCents": 80000,
        "currency": "COP"
    });
    let (_, first) = post_signature(&app, &body).await;
    let (_, second) = post_signature(&app, &body).await;

    assert_eq!(first["signature"], second["signature"]);
}

#[tokio::test]
async fn test_missing_amount_rejected() {
    let app = api_app(create_test_app_state());

    let body = json!({
        "reference": "sub_7",
        "currency": "COP"
    });
    let (status, json) = post_signature(&app, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Datos incompletos en la solicitud.");
}

#[tokio::test]
async fn test_missing_reference_rejected() {
    let app = api_app(create_test_app_state());

    let body = json!({
        "amountInCents": 150000,
        "currency": "COP"
    });
    let (status, json) = post_signature(&app, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Datos incompletos en la solicitud.");
}

#[tokio::test]
async fn test_malformed_json_rejected_with_envelope() {
    let app = api_app(create_test_app_state());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/checkout/signature")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes)
        .expect("Even rejections should use the JSON envelope");
    assert_eq!(json["success"], false);
}
