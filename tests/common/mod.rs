//! Test utilities and fixtures for Caja integration tests

#![allow(dead_code)]

use axum::Router;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

// Re-export the main library crate
pub use caja::config::Config;
pub use caja::crypto::TokenCipher;
pub use caja::db::{init_db, queries, AppState};
pub use caja::email::Mailer;
pub use caja::models::*;
pub use caja::payments::WompiClient;

/// Integrity key every test config uses; `sign` recomputes signatures
/// against the same value.
pub const TEST_INTEGRITY_KEY: &str = "test_integrity_secret";

/// Create a test token cipher (deterministic for testing)
pub fn test_token_cipher() -> TokenCipher {
    // Fixed all-zero key - ONLY for testing!
    TokenCipher::from_bytes([0u8; 32])
}

/// Build a config pointing at the sandbox gateway. No test ever makes an
/// outbound call; the URL only has to parse.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".to_string(),
        wompi_url: "https://sandbox.wompi.co/v1".to_string(),
        wompi_public_key: "pub_test_xxx".to_string(),
        wompi_private_key: "prv_test_xxx".to_string(),
        wompi_integrity_key: TEST_INTEGRITY_KEY.to_string(),
        token_key: test_token_cipher(),
        resend_api_key: None,
        email_from: "Caja <test@example.com>".to_string(),
        notify_email: None,
        dev_mode: true,
    }
}

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Compute the checkout integrity signature the way the gateway does:
/// SHA-256 over reference + amountInCents + currency + integrity key.
/// Deliberately independent of the library's implementation.
pub fn sign(reference: &str, amount_in_cents: i64, currency: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(reference.as_bytes());
    hasher.update(amount_in_cents.to_string().as_bytes());
    hasher.update(currency.as_bytes());
    hasher.update(TEST_INTEGRITY_KEY.as_bytes());
    hex::encode(hasher.finalize())
}

/// Create an AppState for testing with an in-memory database.
///
/// The pool holds a single connection: each pooled in-memory SQLite
/// connection is its own database, so every checkout must see the one
/// that was initialized.
pub fn create_test_app_state() -> AppState {
    let config = test_config();

    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        wompi: WompiClient::new(&config),
        tokens: config.token_key.clone(),
        mailer: Mailer::new(None, "test@example.com".to_string(), None),
    }
}

/// Create a Router with every API endpoint wired to the given state
pub fn api_app(state: AppState) -> Router {
    caja::handlers::router().with_state(state)
}

/// Create a test registration awaiting payment confirmation
pub fn create_test_registration(
    conn: &Connection,
    reference: &str,
    email: &str,
    course: &str,
) -> Registration {
    let input = CreateRegistration {
        name: Some("Ana".to_string()),
        lastname: Some("Gómez".to_string()),
        email: Some(email.to_string()),
        phone: Some("3001234567".to_string()),
        document: Some("1020304050".to_string()),
        payment_reference: Some(reference.to_string()),
        selected_course: Some(course.to_string()),
        num_seats: Some(1),
    };
    queries::insert_registration(conn, &input).expect("Failed to create test registration")
}

/// Create a test payment row with default values
pub fn create_test_payment(conn: &Connection, reference: &str, status: PaymentStatus) -> Payment {
    let input = NewPayment {
        reference: reference.to_string(),
        sponsor_id: None,
        user_id: Some(7),
        amount: 1500.0,
        currency: "COP".to_string(),
        payment_date: None,
        transaction_id: Some(format!("txn-{}", reference)),
        payment_status: status,
        payment_method: "card".to_string(),
    };
    queries::insert_payment(conn, &input).expect("Failed to create test payment")
}

/// Create a pending test subscription for a user
pub fn create_test_subscription(conn: &Connection, user_id: i64) -> Subscription {
    let input = NewSubscription {
        user_id,
        plan_id: Some("plan_monthly".to_string()),
        status: SubscriptionStatus::Pending,
        frequency: Some("monthly".to_string()),
        payment_source_token: Some("enc_test_token".to_string()),
        payment_id: None,
        customer_email: Some("subscriber@example.com".to_string()),
    };
    queries::upsert_subscription(conn, &input).expect("Failed to create test subscription")
}

/// Get the current timestamp
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
