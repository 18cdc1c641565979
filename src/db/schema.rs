use rusqlite::Connection;

/// Initialize the database schema.
///
/// WAL mode: webhook bursts are write-heavy and WAL keeps readers
/// (registration listings) unblocked during ledger writes.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        -- Payments (ledger - one row per gateway payment)
        -- reference is the business key the gateway echoes back in webhooks
        -- amount is in major currency units (gateway minor units / 100)
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            reference TEXT NOT NULL UNIQUE,
            sponsor_id INTEGER,
            user_id INTEGER,
            amount REAL NOT NULL,
            currency TEXT NOT NULL,
            payment_date INTEGER NOT NULL,
            transaction_id TEXT,
            payment_status TEXT NOT NULL CHECK (payment_status IN ('PENDING', 'APPROVED', 'DECLINED', 'VOIDED', 'ERROR')),
            payment_method TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payments_status ON payments(payment_status);
        CREATE INDEX IF NOT EXISTS idx_payments_user ON payments(user_id);

        -- Donations (dependent entity - payment_id holds the parent payment's reference,
        -- both rows are created in the same transaction)
        CREATE TABLE IF NOT EXISTS donations (
            id TEXT PRIMARY KEY,
            payment_id TEXT NOT NULL REFERENCES payments(reference),
            message TEXT NOT NULL,
            amount REAL NOT NULL,
            camper_id INTEGER,
            sponsor_id INTEGER,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_donations_payment ON donations(payment_id);

        -- Subscriptions (one per user; payment_source_token is envelope-encrypted,
        -- never plaintext)
        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL UNIQUE,
            plan_id TEXT,
            status TEXT NOT NULL CHECK (status IN ('pending', 'active', 'cancelled')),
            frequency TEXT,
            payment_source_token TEXT,
            payment_id TEXT,
            customer_email TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscriptions_payment ON subscriptions(payment_id);

        -- Course registrations from the landing form
        -- payment_date NULL until the matching payment is approved; non-NULL = confirmed
        CREATE TABLE IF NOT EXISTS registrations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            lastname TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            document TEXT NOT NULL,
            payment_reference TEXT NOT NULL,
            selected_course TEXT NOT NULL,
            num_seats INTEGER NOT NULL DEFAULT 1,
            payment_date INTEGER,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_registrations_reference ON registrations(payment_reference);
        CREATE INDEX IF NOT EXISTS idx_registrations_course ON registrations(selected_course);
        CREATE INDEX IF NOT EXISTS idx_registrations_confirmed ON registrations(selected_course) WHERE payment_date IS NOT NULL;

        -- Processed webhook events (idempotency markers against at-least-once delivery)
        CREATE TABLE IF NOT EXISTS webhook_events (
            id TEXT PRIMARY KEY,
            provider TEXT NOT NULL,
            event_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(provider, event_id)
        );
        CREATE INDEX IF NOT EXISTS idx_webhook_events_lookup ON webhook_events(provider, event_id);
        "#,
    )?;
    Ok(())
}
