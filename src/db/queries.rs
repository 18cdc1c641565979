use chrono::Utc;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    query_all, query_one, DONATION_COLS, PAYMENT_COLS, REGISTRATION_COLS, SUBSCRIPTION_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Payments ============

/// Insert a ledger row. The UNIQUE constraint on reference is the last
/// line of defense against concurrent duplicate webhooks: the second
/// insert fails here and the caller treats it as a duplicate.
pub fn insert_payment(conn: &Connection, input: &NewPayment) -> Result<Payment> {
    let id = gen_id();
    let now = now();
    let payment_date = input.payment_date.unwrap_or(now);

    conn.execute(
        "INSERT INTO payments (id, reference, sponsor_id, user_id, amount, currency, payment_date, transaction_id, payment_status, payment_method, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &id,
            &input.reference,
            input.sponsor_id,
            input.user_id,
            input.amount,
            &input.currency,
            payment_date,
            &input.transaction_id,
            input.payment_status.as_str(),
            &input.payment_method,
            now
        ],
    )?;

    Ok(Payment {
        id,
        reference: input.reference.clone(),
        sponsor_id: input.sponsor_id,
        user_id: input.user_id,
        amount: input.amount,
        currency: input.currency.clone(),
        payment_date,
        transaction_id: input.transaction_id.clone(),
        payment_status: input.payment_status,
        payment_method: input.payment_method.clone(),
        created_at: now,
    })
}

pub fn get_payment_by_reference(conn: &Connection, reference: &str) -> Result<Option<Payment>> {
    query_one(
        conn,
        &format!("SELECT {} FROM payments WHERE reference = ?1", PAYMENT_COLS),
        &[&reference],
    )
}

// ============ Donations ============

pub fn insert_donation(conn: &Connection, input: &NewDonation) -> Result<Donation> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO donations (id, payment_id, message, amount, camper_id, sponsor_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &id,
            &input.payment_id,
            &input.message,
            input.amount,
            input.camper_id,
            input.sponsor_id,
            now
        ],
    )?;

    Ok(Donation {
        id,
        payment_id: input.payment_id.clone(),
        message: input.message.clone(),
        amount: input.amount,
        camper_id: input.camper_id,
        sponsor_id: input.sponsor_id,
        created_at: now,
    })
}

pub fn list_donations_by_payment(conn: &Connection, payment_id: &str) -> Result<Vec<Donation>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM donations WHERE payment_id = ?1 ORDER BY created_at",
            DONATION_COLS
        ),
        &[&payment_id],
    )
}

// ============ Subscriptions ============

pub fn get_subscription_by_user(conn: &Connection, user_id: i64) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM subscriptions WHERE user_id = ?1",
            SUBSCRIPTION_COLS
        ),
        &[&user_id],
    )
}

/// Create the user's subscription row, or fold the new values into the
/// existing one (each user has at most one row). Absent optional fields
/// keep their stored value; status always takes the new value.
pub fn upsert_subscription(conn: &Connection, input: &NewSubscription) -> Result<Subscription> {
    let now = now();

    match get_subscription_by_user(conn, input.user_id)? {
        Some(_) => {
            conn.execute(
                "UPDATE subscriptions
                 SET plan_id = COALESCE(?1, plan_id),
                     status = ?2,
                     frequency = COALESCE(?3, frequency),
                     payment_source_token = COALESCE(?4, payment_source_token),
                     payment_id = COALESCE(?5, payment_id),
                     customer_email = COALESCE(?6, customer_email),
                     updated_at = ?7
                 WHERE user_id = ?8",
                params![
                    &input.plan_id,
                    input.status.as_str(),
                    &input.frequency,
                    &input.payment_source_token,
                    &input.payment_id,
                    &input.customer_email,
                    now,
                    input.user_id
                ],
            )?;
            get_subscription_by_user(conn, input.user_id)?
                .ok_or_else(|| AppError::Internal("subscription row vanished during upsert".into()))
        }
        None => {
            let id = gen_id();
            conn.execute(
                "INSERT INTO subscriptions (id, user_id, plan_id, status, frequency, payment_source_token, payment_id, customer_email, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    &id,
                    input.user_id,
                    &input.plan_id,
                    input.status.as_str(),
                    &input.frequency,
                    &input.payment_source_token,
                    &input.payment_id,
                    &input.customer_email,
                    now,
                    now
                ],
            )?;
            Ok(Subscription {
                id,
                user_id: input.user_id,
                plan_id: input.plan_id.clone(),
                status: input.status,
                frequency: input.frequency.clone(),
                payment_source_token: input.payment_source_token.clone(),
                payment_id: input.payment_id.clone(),
                customer_email: input.customer_email.clone(),
                created_at: now,
                updated_at: now,
            })
        }
    }
}

/// Reactivate an existing subscription after an upgrade payment.
/// Returns None when the user has no subscription row to upgrade.
pub fn activate_subscription(
    conn: &Connection,
    user_id: i64,
    payment_reference: &str,
) -> Result<Option<Subscription>> {
    let affected = conn.execute(
        "UPDATE subscriptions SET status = 'active', payment_id = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![payment_reference, now(), user_id],
    )?;
    if affected == 0 {
        return Ok(None);
    }
    get_subscription_by_user(conn, user_id)
}

// ============ Registrations ============

/// Insert a registration row with payment_date NULL; the webhook handler
/// stamps it once the matching payment is approved. Required fields are
/// validated by the caller.
pub fn insert_registration(conn: &Connection, input: &CreateRegistration) -> Result<Registration> {
    let id = gen_id();
    let now = now();
    let num_seats = input.num_seats.unwrap_or(1);

    conn.execute(
        "INSERT INTO registrations (id, name, lastname, email, phone, document, payment_reference, selected_course, num_seats, payment_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10)",
        params![
            &id,
            input.name.as_deref().unwrap_or_default(),
            input.lastname.as_deref().unwrap_or_default(),
            input.email.as_deref().unwrap_or_default(),
            input.phone.as_deref().unwrap_or_default(),
            input.document.as_deref().unwrap_or_default(),
            input.payment_reference.as_deref().unwrap_or_default(),
            input.selected_course.as_deref().unwrap_or_default(),
            num_seats,
            now
        ],
    )?;

    Ok(Registration {
        id,
        name: input.name.clone().unwrap_or_default(),
        lastname: input.lastname.clone().unwrap_or_default(),
        email: input.email.clone().unwrap_or_default(),
        phone: input.phone.clone().unwrap_or_default(),
        document: input.document.clone().unwrap_or_default(),
        payment_reference: input.payment_reference.clone().unwrap_or_default(),
        selected_course: input.selected_course.clone().unwrap_or_default(),
        num_seats,
        payment_date: None,
        created_at: now,
    })
}

pub fn list_registrations(conn: &Connection, course: Option<&str>) -> Result<Vec<Registration>> {
    match course {
        Some(course) => query_all(
            conn,
            &format!(
                "SELECT {} FROM registrations WHERE selected_course = ?1 ORDER BY created_at DESC",
                REGISTRATION_COLS
            ),
            &[&course],
        ),
        None => query_all(
            conn,
            &format!(
                "SELECT {} FROM registrations ORDER BY created_at DESC",
                REGISTRATION_COLS
            ),
            &[],
        ),
    }
}

pub fn get_registration_by_id(conn: &Connection, id: &str) -> Result<Option<Registration>> {
    query_one(
        conn,
        &format!("SELECT {} FROM registrations WHERE id = ?1", REGISTRATION_COLS),
        &[&id],
    )
}

/// Count payment-confirmed registrations, optionally for one course.
pub fn count_confirmed_registrations(conn: &Connection, course: Option<&str>) -> Result<i64> {
    let count = match course {
        Some(course) => conn.query_row(
            "SELECT COUNT(*) FROM registrations WHERE payment_date IS NOT NULL AND selected_course = ?1",
            params![course],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM registrations WHERE payment_date IS NOT NULL",
            [],
            |row| row.get(0),
        )?,
    };
    Ok(count)
}

/// Stamp payment_date on every unconfirmed registration matching the
/// payment reference. Returns the rows confirmed by this call so the
/// caller can queue welcome emails after commit.
pub fn confirm_registrations_by_reference(
    conn: &Connection,
    payment_reference: &str,
    confirmed_at: i64,
) -> Result<Vec<Registration>> {
    let pending: Vec<Registration> = query_all(
        conn,
        &format!(
            "SELECT {} FROM registrations WHERE payment_reference = ?1 AND payment_date IS NULL",
            REGISTRATION_COLS
        ),
        &[&payment_reference],
    )?;

    if pending.is_empty() {
        return Ok(Vec::new());
    }

    conn.execute(
        "UPDATE registrations SET payment_date = ?1 WHERE payment_reference = ?2 AND payment_date IS NULL",
        params![confirmed_at, payment_reference],
    )?;

    Ok(pending
        .into_iter()
        .map(|r| Registration {
            payment_date: Some(confirmed_at),
            ..r
        })
        .collect())
}

// ============ Webhook Events ============

/// Record a processed webhook event. Returns false when the
/// (provider, event_id) pair is already recorded, i.e. this delivery is a
/// duplicate. Run inside the same transaction as the event's effects so a
/// failed dispatch releases the claim.
pub fn try_record_webhook_event(conn: &Connection, provider: &str, event_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "INSERT OR IGNORE INTO webhook_events (id, provider, event_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![gen_id(), provider, event_id, now()],
    )?;
    Ok(affected > 0)
}

/// Purge webhook-event markers beyond the retention period. They only
/// defend against gateway re-delivery, which stops after a few days.
/// Returns the number of deleted records.
pub fn purge_old_webhook_events(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM webhook_events WHERE created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

// ============ Payment Ledger ============

/// Dependent record to create together with a payment.
#[derive(Debug, Clone)]
pub enum PaymentDependent {
    Donation(NewDonation),
    Subscription(NewSubscription),
}

/// The dependent row written by `create_payment_and_dependent`.
#[derive(Debug, Clone)]
pub enum CreatedDependent {
    Donation(Donation),
    Subscription(Subscription),
}

/// Insert a payment and its dependent row in one transaction.
///
/// IMMEDIATE mode takes the write lock up front so two concurrent calls
/// for the same reference serialize; the loser hits the UNIQUE constraint
/// on reference and rolls back without leaving partial state.
pub fn create_payment_and_dependent(
    conn: &mut Connection,
    payment: NewPayment,
    dependent: PaymentDependent,
) -> Result<(Payment, CreatedDependent)> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

    let payment = insert_payment(&tx, &payment)?;
    let dependent = match dependent {
        PaymentDependent::Donation(input) => {
            CreatedDependent::Donation(insert_donation(&tx, &input)?)
        }
        PaymentDependent::Subscription(input) => {
            CreatedDependent::Subscription(upsert_subscription(&tx, &input)?)
        }
    };

    tx.commit()?;
    Ok((payment, dependent))
}
