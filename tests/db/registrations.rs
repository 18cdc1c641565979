//! Registration query tests - inserts, listing, confirmation stamping

#[path = "../common/mod.rs"]
mod common;

use common::*;

// ============ Insert Tests ============

#[test]
fn test_insert_registration_starts_unconfirmed() {
    let conn = setup_test_db();

    let registration = create_test_registration(&conn, "ia_2024-01", "ana@example.com", "Curso IA");

    assert!(!registration.id.is_empty());
    assert_eq!(registration.payment_reference, "ia_2024-01");
    assert_eq!(registration.num_seats, 1);
    assert!(
        registration.payment_date.is_none(),
        "A new registration must await payment confirmation"
    );
}

#[test]
fn test_num_seats_defaults_to_one() {
    let conn = setup_test_db();

    let input = CreateRegistration {
        name: Some("Luis".to_string()),
        lastname: Some("Pérez".to_string()),
        email: Some("luis@example.com".to_string()),
        phone: Some("3110000000".to_string()),
        document: Some("900123".to_string()),
        payment_reference: Some("ia_2024-02".to_string()),
        selected_course: Some("Curso IA".to_string()),
        num_seats: None,
    };
    let registration = queries::insert_registration(&conn, &input).expect("Insert should succeed");

    assert_eq!(registration.num_seats, 1);
}

// ============ Listing Tests ============

#[test]
fn test_list_registrations_filters_by_course() {
    let conn = setup_test_db();

    create_test_registration(&conn, "ia_1", "a@example.com", "Curso IA");
    create_test_registration(&conn, "ia_2", "b@example.com", "Curso IA");
    create_test_registration(&conn, "ia_3", "c@example.com", "Curso Web");

    let all = queries::list_registrations(&conn, None).expect("Query should succeed");
    assert_eq!(all.len(), 3);

    let ia_only = queries::list_registrations(&conn, Some("Curso IA")).expect("Query should succeed");
    assert_eq!(ia_only.len(), 2);
    assert!(ia_only.iter().all(|r| r.selected_course == "Curso IA"));

    let none = queries::list_registrations(&conn, Some("Curso X")).expect("Query should succeed");
    assert!(none.is_empty());
}

#[test]
fn test_get_registration_by_id() {
    let conn = setup_test_db();

    let created = create_test_registration(&conn, "ia_1", "a@example.com", "Curso IA");

    let fetched = queries::get_registration_by_id(&conn, &created.id)
        .expect("Query should succeed")
        .expect("Registration should exist");
    assert_eq!(fetched.email, "a@example.com");

    let missing = queries::get_registration_by_id(&conn, "does-not-exist")
        .expect("Query should succeed");
    assert!(missing.is_none());
}

// ============ Confirmation Tests ============

#[test]
fn test_confirm_stamps_every_matching_registration() {
    let conn = setup_test_db();

    create_test_registration(&conn, "ia_group", "a@example.com", "Curso IA");
    create_test_registration(&conn, "ia_group", "b@example.com", "Curso IA");
    create_test_registration(&conn, "ia_other", "c@example.com", "Curso IA");

    let confirmed_at = now();
    let confirmed = queries::confirm_registrations_by_reference(&conn, "ia_group", confirmed_at)
        .expect("Confirm should succeed");

    assert_eq!(confirmed.len(), 2, "Both registrations under the reference confirm");
    assert!(confirmed.iter().all(|r| r.payment_date == Some(confirmed_at)));

    // The unrelated reference is untouched
    let all = queries::list_registrations(&conn, None).unwrap();
    let other = all.iter().find(|r| r.payment_reference == "ia_other").unwrap();
    assert!(other.payment_date.is_none());
}

#[test]
fn test_confirm_skips_already_confirmed_rows() {
    let conn = setup_test_db();

    create_test_registration(&conn, "ia_once", "a@example.com", "Curso IA");

    let first = queries::confirm_registrations_by_reference(&conn, "ia_once", now())
        .expect("Confirm should succeed");
    assert_eq!(first.len(), 1);

    let second = queries::confirm_registrations_by_reference(&conn, "ia_once", now())
        .expect("Confirm should succeed");
    assert!(
        second.is_empty(),
        "A second confirmation pass must not re-confirm (or re-email) anyone"
    );
}

#[test]
fn test_confirm_unknown_reference_returns_empty() {
    let conn = setup_test_db();

    let confirmed = queries::confirm_registrations_by_reference(&conn, "ia_ghost", now())
        .expect("Confirm should succeed");

    assert!(confirmed.is_empty());
}

// ============ Confirmed Count Tests ============

#[test]
fn test_count_confirmed_registrations() {
    let conn = setup_test_db();

    create_test_registration(&conn, "ia_1", "a@example.com", "Curso IA");
    create_test_registration(&conn, "ia_2", "b@example.com", "Curso IA");
    create_test_registration(&conn, "web_1", "c@example.com", "Curso Web");

    assert_eq!(queries::count_confirmed_registrations(&conn, None).unwrap(), 0);

    queries::confirm_registrations_by_reference(&conn, "ia_1", now()).unwrap();
    queries::confirm_registrations_by_reference(&conn, "web_1", now()).unwrap();

    assert_eq!(queries::count_confirmed_registrations(&conn, None).unwrap(), 2);
    assert_eq!(
        queries::count_confirmed_registrations(&conn, Some("Curso IA")).unwrap(),
        1
    );
    assert_eq!(
        queries::count_confirmed_registrations(&conn, Some("Curso X")).unwrap(),
        0
    );
}
