//! HTTP request handlers, grouped by flow.

pub mod checkout;
pub mod donations;
pub mod payment_sources;
pub mod registrations;
pub mod webhooks;

use axum::{routing::get, Router};
use serde::Serialize;

use crate::db::AppState;
use crate::extractors::Json;

/// Response envelope for the synchronous endpoints. All four fields are
/// serialized on every response; the frontend destructures them
/// unconditionally, so `data` and `error` stay explicit nulls.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: Some(data),
            error: None,
        })
    }
}

impl ApiResponse<()> {
    /// Success envelope with no payload (`data` serializes as null).
    pub fn message(message: &str) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data: None,
            error: None,
        })
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(checkout::router())
        .merge(donations::router())
        .merge(payment_sources::router())
        .merge(registrations::router())
        .merge(webhooks::router())
}
