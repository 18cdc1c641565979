//! Wompi webhook ingestion.
//!
//! Delivery is at-least-once and unordered, so every event is
//! signature-checked, claimed against the processed-events table, and
//! dispatched to the handlers its reference prefix selects, all inside a
//! single transaction. A failure anywhere rolls the claim back and the
//! 500 response makes the gateway redeliver.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::{queries, AppState};
use crate::error::{msg, AppError, Result};
use crate::extractors::Json;
use crate::models::{NewDonation, NewPayment, NewSubscription, PaymentStatus, SubscriptionStatus};
use crate::payments::WompiWebhookPayload;
use crate::util::extract_request_info;

const PROVIDER: &str = "wompi";

/// Handlers a webhook reference can select. Prefixes are checked
/// independently, so a reference can in principle carry several tags;
/// dispatch iterates the full set rather than stopping at the first hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerTag {
    /// `ia_` - course-registration payment
    CourseRegistration,
    /// `sub_` - new subscription
    NewSubscription,
    /// `upg_` - plan upgrade
    PlanUpgrade,
    /// `don_` - donation
    Donation,
}

impl HandlerTag {
    /// Donations persist whatever status the gateway reports; the other
    /// three act only on APPROVED.
    fn requires_approval(self) -> bool {
        !matches!(self, HandlerTag::Donation)
    }
}

pub fn classify(reference: &str) -> Vec<HandlerTag> {
    let mut tags = Vec::new();
    if reference.starts_with("ia_") {
        tags.push(HandlerTag::CourseRegistration);
    }
    if reference.starts_with("sub_") {
        tags.push(HandlerTag::NewSubscription);
    }
    if reference.starts_with("upg_") {
        tags.push(HandlerTag::PlanUpgrade);
    }
    if reference.starts_with("don_") {
        tags.push(HandlerTag::Donation);
    }
    tags
}

/// Idempotency key for one delivery. Status is part of the key so a
/// PENDING notification does not block the APPROVED one that follows it.
fn event_key(event: &WompiWebhookPayload, status: PaymentStatus) -> String {
    format!(
        "{}:{}:{}",
        event.reference,
        event.transaction_id.as_deref().unwrap_or("-"),
        status
    )
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Welcome email queued during dispatch and sent only after commit.
struct WelcomeEmail {
    to: String,
    full_name: String,
    course: String,
}

enum Outcome {
    Processed { welcome_emails: Vec<WelcomeEmail> },
    Duplicate,
}

fn insert_event_payment(
    tx: &Connection,
    event: &WompiWebhookPayload,
    status: PaymentStatus,
) -> Result<()> {
    queries::insert_payment(
        tx,
        &NewPayment {
            reference: event.reference.clone(),
            sponsor_id: None,
            user_id: event.customer_id(),
            amount: event.amount_major(),
            currency: event.currency.clone(),
            payment_date: None,
            transaction_id: event.transaction_id.clone(),
            payment_status: status,
            payment_method: event.payment_method(),
        },
    )?;
    Ok(())
}

/// Apply one webhook event: claim it, then run every selected handler,
/// in a single IMMEDIATE transaction. Concurrent deliveries for the same
/// reference serialize on the write lock; the loser sees the committed
/// claim (or hits the ledger's UNIQUE reference) and reports Duplicate.
fn process_event_atomic(
    conn: &mut Connection,
    event: &WompiWebhookPayload,
    status: PaymentStatus,
    tags: &[HandlerTag],
) -> Result<Outcome> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

    // Claim first. The claim only becomes durable if the whole dispatch
    // commits, so a failed attempt leaves the event reprocessable.
    if !queries::try_record_webhook_event(&tx, PROVIDER, &event_key(event, status))? {
        return Ok(Outcome::Duplicate);
    }

    // Re-sent confirmations for an already-settled payment are duplicates
    // even when they arrive under a fresh event id.
    if let Some(existing) = queries::get_payment_by_reference(&tx, &event.reference)? {
        if existing.payment_status.is_terminal() {
            return Ok(Outcome::Duplicate);
        }
    }

    let active: Vec<HandlerTag> = tags
        .iter()
        .copied()
        .filter(|tag| !tag.requires_approval() || status == PaymentStatus::Approved)
        .collect();

    if active.is_empty() {
        // Nothing to apply (e.g. a declined course payment). Commit the
        // claim so this exact delivery is not reprocessed.
        tx.commit()?;
        return Ok(Outcome::Processed {
            welcome_emails: Vec::new(),
        });
    }

    // One ledger row per event, no matter how many tags matched.
    match insert_event_payment(&tx, event, status) {
        Ok(()) => {}
        Err(AppError::Database(e)) if is_unique_violation(&e) => {
            // Lost the race against a concurrent delivery for the same
            // reference; dropping the transaction releases the claim and
            // the winner owns the effects.
            return Ok(Outcome::Duplicate);
        }
        Err(e) => return Err(e),
    }

    let mut welcome_emails = Vec::new();
    for tag in active {
        match tag {
            HandlerTag::CourseRegistration => {
                let confirmed = queries::confirm_registrations_by_reference(
                    &tx,
                    &event.reference,
                    chrono::Utc::now().timestamp(),
                )?;
                if confirmed.is_empty() {
                    tracing::warn!(
                        reference = %event.reference,
                        "approved course payment matched no pending registration"
                    );
                }
                for registration in confirmed {
                    welcome_emails.push(WelcomeEmail {
                        full_name: format!("{} {}", registration.name, registration.lastname),
                        to: registration.email,
                        course: registration.selected_course,
                    });
                }
            }
            HandlerTag::NewSubscription => match event.customer_id() {
                Some(user_id) => {
                    queries::upsert_subscription(
                        &tx,
                        &NewSubscription {
                            user_id,
                            plan_id: None,
                            status: SubscriptionStatus::Active,
                            frequency: None,
                            payment_source_token: None,
                            payment_id: Some(event.reference.clone()),
                            customer_email: None,
                        },
                    )?;
                }
                None => {
                    tracing::warn!(
                        reference = %event.reference,
                        "subscription payment without a customer id, only the ledger row was recorded"
                    );
                }
            },
            HandlerTag::PlanUpgrade => match event.customer_id() {
                Some(user_id) => {
                    if queries::activate_subscription(&tx, user_id, &event.reference)?.is_none() {
                        tracing::warn!(
                            user_id,
                            reference = %event.reference,
                            "upgrade payment for a user with no subscription row"
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        reference = %event.reference,
                        "upgrade payment without a customer id, only the ledger row was recorded"
                    );
                }
            },
            HandlerTag::Donation => {
                queries::insert_donation(
                    &tx,
                    &NewDonation {
                        payment_id: event.reference.clone(),
                        message: format!("Donation via {}", event.payment_method()),
                        amount: event.amount_major(),
                        camper_id: None,
                        sponsor_id: event.customer_id(),
                    },
                )?;
            }
        }
    }

    tx.commit()?;
    Ok(Outcome::Processed { welcome_emails })
}

#[derive(Debug, Serialize)]
pub struct WebhookReply {
    pub received: bool,
    pub message: &'static str,
}

fn reply(message: &'static str) -> (StatusCode, Json<WebhookReply>) {
    (
        StatusCode::OK,
        Json(WebhookReply {
            received: true,
            message,
        }),
    )
}

pub async fn handle_wompi_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<WompiWebhookPayload>,
) -> Result<(StatusCode, Json<WebhookReply>)> {
    // Reject before touching the database; a forged payload must leave
    // no trace beyond the tamper log line.
    if !state.wompi.verify_signature(
        &event.reference,
        event.amount_in_cents,
        &event.currency,
        &event.signature,
    ) {
        let (ip, user_agent) = extract_request_info(&headers);
        tracing::warn!(
            reference = %event.reference,
            ip = ip.as_deref().unwrap_or("unknown"),
            user_agent = user_agent.as_deref().unwrap_or("unknown"),
            "webhook signature mismatch"
        );
        return Err(AppError::SignatureMismatch);
    }

    let status = PaymentStatus::from_gateway(event.status.as_deref());
    let tags = classify(&event.reference);

    if tags.is_empty() {
        tracing::info!(
            reference = %event.reference,
            "webhook reference matches no known prefix, acknowledging"
        );
        return Ok(reply(msg::WEBHOOK_RECEIVED));
    }

    tracing::info!(
        reference = %event.reference,
        status = %status,
        ?tags,
        "processing webhook"
    );

    let mut conn = state.db.get()?;
    match process_event_atomic(&mut conn, &event, status, &tags)? {
        Outcome::Duplicate => {
            tracing::info!(reference = %event.reference, "duplicate delivery discarded");
            Ok(reply(msg::DUPLICATE_EVENT))
        }
        Outcome::Processed { welcome_emails } => {
            // Post-commit sends: an email failure must not 500 the webhook,
            // the ledger write is already durable and a gateway retry would
            // only be discarded as a duplicate.
            for email in welcome_emails {
                if let Err(e) = state
                    .mailer
                    .send_welcome_email(&email.to, &email.full_name, &email.course)
                    .await
                {
                    tracing::warn!(
                        to = %email.to,
                        "welcome email failed after registration confirmation: {}",
                        e
                    );
                }
            }
            Ok(reply(msg::WEBHOOK_RECEIVED))
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/wompi", post(handle_wompi_webhook))
}
