//! Synchronous donation persistence.
//!
//! The checkout widget posts the gateway's payment confirmation here
//! directly. The payload carries the same integrity signature as a webhook
//! and is verified before any row is written; the payment and its donation
//! land in one transaction.

use axum::{extract::State, routing::post, Router};
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::{Donation, NewDonation, NewPayment, Payment, PaymentStatus};
use crate::payments::CustomerData;

#[derive(Debug, Deserialize)]
pub struct DonationRequest {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default, rename = "amountInCents")]
    pub amount_in_cents: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub payment_date: Option<i64>,
    #[serde(default, rename = "customerData")]
    pub customer_data: Option<CustomerData>,
    #[serde(default, rename = "paymentMethodType")]
    pub payment_method_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DonationSaved {
    pub payment: Payment,
    pub donation: Donation,
}

pub async fn save_donation(
    State(state): State<AppState>,
    Json(request): Json<DonationRequest>,
) -> Result<Json<super::ApiResponse<DonationSaved>>> {
    let (Some(reference), Some(amount_in_cents), Some(currency), Some(signature)) = (
        request.reference,
        request.amount_in_cents,
        request.currency,
        request.signature,
    ) else {
        return Err(AppError::Validation(msg::INCOMPLETE_REQUEST.into()));
    };

    // No writes happen until the payload proves it came from the gateway.
    if !state
        .wompi
        .verify_signature(&reference, amount_in_cents, &currency, &signature)
    {
        return Err(AppError::SignatureMismatch);
    }

    let status = PaymentStatus::from_gateway(request.status.as_deref());
    let method = request
        .payment_method_type
        .as_deref()
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let customer_id = request.customer_data.as_ref().and_then(CustomerData::coerced_id);
    let amount = amount_in_cents as f64 / 100.0;

    let payment = NewPayment {
        reference: reference.clone(),
        sponsor_id: None,
        user_id: customer_id,
        amount,
        currency,
        payment_date: request.payment_date,
        transaction_id: request.transaction_id,
        payment_status: status,
        payment_method: method.clone(),
    };
    let donation = NewDonation {
        payment_id: reference,
        message: format!("Donation via {}", method),
        amount,
        camper_id: None,
        sponsor_id: customer_id,
    };

    let mut conn = state.db.get()?;
    let (payment, dependent) = queries::create_payment_and_dependent(
        &mut conn,
        payment,
        queries::PaymentDependent::Donation(donation),
    )?;

    let queries::CreatedDependent::Donation(donation) = dependent else {
        return Err(AppError::Internal(
            "ledger returned a non-donation dependent".into(),
        ));
    };

    tracing::info!(
        reference = %payment.reference,
        amount = payment.amount,
        status = %payment.payment_status,
        "donation recorded"
    );

    Ok(super::ApiResponse::ok(
        msg::DONATION_SAVED,
        DonationSaved { payment, donation },
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/donations", post(save_donation))
}
