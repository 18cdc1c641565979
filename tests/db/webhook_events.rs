//! Webhook event claim and retention tests

#[path = "../common/mod.rs"]
mod common;

use common::*;

fn count_events(conn: &rusqlite::Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM webhook_events", [], |row| row.get(0))
        .expect("Count should succeed")
}

// ============ Claim Tests ============

#[test]
fn test_event_claims_only_once() {
    let conn = setup_test_db();

    let first = queries::try_record_webhook_event(&conn, "wompi", "don_1:tx-1:APPROVED")
        .expect("Claim should succeed");
    assert!(first, "First delivery claims the event");

    let second = queries::try_record_webhook_event(&conn, "wompi", "don_1:tx-1:APPROVED")
        .expect("Claim should succeed");
    assert!(!second, "Second delivery of the same event is a duplicate");

    assert_eq!(count_events(&conn), 1);
}

#[test]
fn test_distinct_events_claim_independently() {
    let conn = setup_test_db();

    assert!(queries::try_record_webhook_event(&conn, "wompi", "don_1:tx-1:APPROVED").unwrap());
    assert!(queries::try_record_webhook_event(&conn, "wompi", "don_1:tx-2:APPROVED").unwrap());
    assert!(queries::try_record_webhook_event(&conn, "wompi", "don_1:tx-1:PENDING").unwrap());

    assert_eq!(count_events(&conn), 3);
}

#[test]
fn test_same_event_id_under_another_provider_is_distinct() {
    let conn = setup_test_db();

    assert!(queries::try_record_webhook_event(&conn, "wompi", "evt_1").unwrap());
    assert!(queries::try_record_webhook_event(&conn, "other", "evt_1").unwrap());

    assert_eq!(count_events(&conn), 2);
}

// ============ Retention Tests ============

#[test]
fn test_purge_removes_only_expired_events() {
    let conn = setup_test_db();

    queries::try_record_webhook_event(&conn, "wompi", "evt_old").unwrap();
    queries::try_record_webhook_event(&conn, "wompi", "evt_fresh").unwrap();

    // Backdate one marker past the retention window
    conn.execute(
        "UPDATE webhook_events SET created_at = ?1 WHERE event_id = 'evt_old'",
        rusqlite::params![now() - 40 * 86400],
    )
    .expect("Backdate should succeed");

    let deleted = queries::purge_old_webhook_events(&conn, 30).expect("Purge should succeed");

    assert_eq!(deleted, 1);
    assert_eq!(count_events(&conn), 1);

    // The fresh marker still blocks its duplicate
    assert!(!queries::try_record_webhook_event(&conn, "wompi", "evt_fresh").unwrap());
    // The purged one can be claimed again
    assert!(queries::try_record_webhook_event(&conn, "wompi", "evt_old").unwrap());
}

#[test]
fn test_purge_with_nothing_expired_deletes_nothing() {
    let conn = setup_test_db();

    queries::try_record_webhook_event(&conn, "wompi", "evt_1").unwrap();

    let deleted = queries::purge_old_webhook_events(&conn, 30).expect("Purge should succeed");

    assert_eq!(deleted, 0);
    assert_eq!(count_events(&conn), 1);
}
