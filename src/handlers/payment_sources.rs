//! Reusable payment-source registration.
//!
//! Synchronous flow: fetch the gateway's acceptance tokens, register the
//! card/account token as a payment source, then persist a pending ledger
//! placeholder and the subscription link in one local transaction. The
//! gateway id is encrypted before it is stored or returned; only the
//! encrypted form ever leaves this handler.

use axum::{extract::State, http::HeaderMap, routing::post, Router};
use serde::Deserialize;

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::{NewPayment, NewSubscription, PaymentStatus, SubscriptionStatus};
use crate::payments::CreatePaymentSourceRequest;

#[derive(Debug, Deserialize)]
pub struct PaymentSourceBody {
    #[serde(default, rename = "type")]
    pub source_type: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub payment_description: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
}

/// Caller identity, set by the fronting auth proxy.
fn caller_user_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("x-user-id")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

pub async fn create_payment_source(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PaymentSourceBody>,
) -> Result<Json<super::ApiResponse<PaymentSourceData>>> {
    let user_id = caller_user_id(&headers)
        .ok_or_else(|| AppError::Validation(msg::MISSING_USER.into()))?;
    let source_type = request
        .source_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation(msg::MISSING_PAYMENT_TYPE.into()))?;

    let tokens = state.wompi.fetch_acceptance_tokens().await?;

    tracing::info!(user_id, source_type, "creating gateway payment source");
    let created = state
        .wompi
        .create_payment_source(&CreatePaymentSourceRequest {
            source_type,
            token: request.token.as_deref(),
            payment_description: request.payment_description.as_deref(),
            customer_email: request.customer_email.as_deref(),
            acceptance_token: &tokens.acceptance,
            accept_personal_auth: &tokens.personal_data_auth,
        })
        .await?;

    let encrypted_id = state
        .tokens
        .encrypt_source_id(&user_id.to_string(), &created.id)?;

    // Ledger placeholder under a fresh sub_ reference. The gateway's own
    // webhook for this reference later flips the status; the placeholder
    // keeps the reference reserved and the subscription linkable meanwhile.
    let reference = format!("sub_{}", uuid::Uuid::new_v4());
    let payment = NewPayment {
        reference: reference.clone(),
        sponsor_id: Some(user_id),
        user_id: None,
        amount: 0.0,
        currency: request.currency.unwrap_or_else(|| "COP".to_string()),
        payment_date: None,
        transaction_id: None,
        payment_status: PaymentStatus::Pending,
        payment_method: source_type.to_string(),
    };
    let subscription = NewSubscription {
        user_id,
        plan_id: request.plan_id,
        status: SubscriptionStatus::Pending,
        frequency: request.frequency,
        payment_source_token: Some(encrypted_id.clone()),
        payment_id: Some(reference.clone()),
        customer_email: request.customer_email,
    };

    let mut conn = state.db.get()?;
    if let Err(e) = queries::create_payment_and_dependent(
        &mut conn,
        payment,
        queries::PaymentDependent::Subscription(subscription),
    ) {
        // The gateway source already exists; it will resurface via the
        // webhook for this reference, so log enough to reconcile.
        tracing::error!(
            user_id,
            reference = %reference,
            "local writes failed after gateway payment source was created: {}",
            e
        );
        return Err(e);
    }

    // Echo the gateway's payment-source object with its id swapped for the
    // encrypted token.
    let mut api_data = created
        .body
        .get("data")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    api_data["id"] = serde_json::Value::String(encrypted_id);

    Ok(super::ApiResponse::ok(
        msg::PAY_SOURCE_CREATED,
        PaymentSourceData {
            payment_source_api_data: api_data,
        },
    ))
}

#[derive(Debug, serde::Serialize)]
pub struct PaymentSourceData {
    pub payment_source_api_data: serde_json::Value,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/payment-sources", post(create_payment_source))
}
