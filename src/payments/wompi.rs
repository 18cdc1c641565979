use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Outbound calls get a bounded timeout so a stalled gateway surfaces as
/// a transport error (and a 500/retry upstream) instead of hanging the
/// request forever.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Wompi API plus the checkout integrity-signature scheme.
///
/// Signatures are symmetric: the same SHA-256 digest is embedded in
/// outbound checkout redirects and recomputed to verify inbound webhook
/// payloads.
#[derive(Debug, Clone)]
pub struct WompiClient {
    client: Client,
    base_url: String,
    public_key: String,
    private_key: String,
    integrity_key: String,
}

impl WompiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.wompi_url.trim_end_matches('/').to_string(),
            public_key: config.wompi_public_key.clone(),
            private_key: config.wompi_private_key.clone(),
            integrity_key: config.wompi_integrity_key.clone(),
        }
    }

    /// Compute the checkout integrity signature: lowercase hex SHA-256 of
    /// reference + amountInCents + currency + integrity key, exactly the
    /// concatenation the gateway uses.
    pub fn generate_signature(
        &self,
        reference: &str,
        amount_in_cents: i64,
        currency: &str,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(reference.as_bytes());
        hasher.update(amount_in_cents.to_string().as_bytes());
        hasher.update(currency.as_bytes());
        hasher.update(self.integrity_key.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Check a payload's signature against the recomputed value.
    ///
    /// Uses constant-time comparison so response timing leaks nothing
    /// about the expected signature.
    pub fn verify_signature(
        &self,
        reference: &str,
        amount_in_cents: i64,
        currency: &str,
        provided: &str,
    ) -> bool {
        let expected = self.generate_signature(reference, amount_in_cents, currency);
        let expected_bytes = expected.as_bytes();
        let provided_bytes = provided.as_bytes();

        // Length is not secret (a SHA-256 digest is always 64 hex chars),
        // so the early exit does not leak
        if expected_bytes.len() != provided_bytes.len() {
            return false;
        }

        expected_bytes.ct_eq(provided_bytes).into()
    }

    /// Fetch the merchant's presigned acceptance tokens, required by the
    /// gateway before a payment source can be created.
    pub async fn fetch_acceptance_tokens(&self) -> Result<AcceptanceTokens> {
        let url = format!("{}/merchants/{}", self.base_url, self.public_key);
        let response = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let merchant: MerchantResponse = response.json().await?;
        Ok(AcceptanceTokens {
            acceptance: merchant.data.presigned_acceptance.acceptance_token,
            personal_data_auth: merchant.data.presigned_personal_data_auth.acceptance_token,
        })
    }

    /// Create a reusable payment source from a tokenized instrument.
    ///
    /// No retry here: the caller owns the idempotency/transaction
    /// boundary and decides what a failure means.
    pub async fn create_payment_source(
        &self,
        request: &CreatePaymentSourceRequest<'_>,
    ) -> Result<CreatedPaymentSource> {
        let url = format!("{}/payment_sources", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.private_key)
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await?;

        // The source id is a number in current API versions but was a
        // string historically; accept both.
        let id = match &body["data"]["id"] {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.clone(),
            _ => {
                return Err(AppError::Internal(
                    "gateway response missing payment source id".into(),
                ))
            }
        };

        Ok(CreatedPaymentSource { id, body })
    }
}

/// Presigned acceptance tokens fetched from the merchant endpoint.
#[derive(Debug, Clone)]
pub struct AcceptanceTokens {
    pub acceptance: String,
    pub personal_data_auth: String,
}

/// A payment source the gateway created. `id` is the plaintext gateway
/// identifier; callers must encrypt it before storing or returning it.
#[derive(Debug, Clone)]
pub struct CreatedPaymentSource {
    pub id: String,
    /// Full gateway response body, relayed to the caller (with the id
    /// replaced by its encrypted form).
    pub body: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentSourceRequest<'a> {
    #[serde(rename = "type")]
    pub source_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<&'a str>,
    pub acceptance_token: &'a str,
    pub accept_personal_auth: &'a str,
}

#[derive(Debug, Deserialize)]
struct MerchantResponse {
    data: MerchantData,
}

#[derive(Debug, Deserialize)]
struct MerchantData {
    presigned_acceptance: PresignedToken,
    presigned_personal_data_auth: PresignedToken,
}

#[derive(Debug, Deserialize)]
struct PresignedToken {
    acceptance_token: String,
}

// ============ Webhook payload ============

/// Inbound webhook body. The integrity signature covers reference +
/// amountInCents + currency; everything else is advisory until verified
/// against local state.
#[derive(Debug, Deserialize)]
pub struct WompiWebhookPayload {
    pub reference: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "amountInCents")]
    pub amount_in_cents: i64,
    pub currency: String,
    pub signature: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default, rename = "customerData")]
    pub customer_data: Option<CustomerData>,
    #[serde(default, rename = "paymentMethodType")]
    pub payment_method_type: Option<String>,
}

impl WompiWebhookPayload {
    /// Amount in major currency units (the gateway reports minor units).
    pub fn amount_major(&self) -> f64 {
        self.amount_in_cents as f64 / 100.0
    }

    /// Payment method normalized to lowercase; "unknown" when absent.
    pub fn payment_method(&self) -> String {
        match self.payment_method_type.as_deref() {
            Some(m) if !m.trim().is_empty() => m.trim().to_lowercase(),
            _ => "unknown".to_string(),
        }
    }

    pub fn customer_id(&self) -> Option<i64> {
        self.customer_data.as_ref().and_then(CustomerData::coerced_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct CustomerData {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

impl CustomerData {
    /// The checkout widget sends the id as a number or a numeric string
    /// depending on its version; coerce either to i64.
    pub fn coerced_id(&self) -> Option<i64> {
        match self.id.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}
