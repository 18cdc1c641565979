//! Checkout signature generation.
//!
//! The widget embeds this signature in the redirect to the gateway, which
//! recomputes it to prove the checkout was initiated by this server.

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default, rename = "amountInCents")]
    pub amount_in_cents: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Bare object on purpose: the checkout widget reads `signature` directly,
/// without the envelope the other synchronous endpoints use.
#[derive(Debug, Serialize)]
pub struct SignatureResponse {
    pub signature: String,
}

pub async fn generate_signature(
    State(state): State<AppState>,
    Json(request): Json<SignatureRequest>,
) -> Result<Json<SignatureResponse>> {
    let (Some(reference), Some(amount_in_cents), Some(currency)) =
        (request.reference, request.amount_in_cents, request.currency)
    else {
        return Err(AppError::Validation(msg::INCOMPLETE_REQUEST.into()));
    };

    let signature = state
        .wompi
        .generate_signature(&reference, amount_in_cents, &currency);

    Ok(Json(SignatureResponse { signature }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/checkout/signature", post(generate_signature))
}
