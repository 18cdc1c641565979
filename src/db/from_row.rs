//! `FromRow` trait plus query helpers so row mapping lives in one place
//! instead of being repeated as closures at every call site.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const PAYMENT_COLS: &str = "id, reference, sponsor_id, user_id, amount, currency, payment_date, transaction_id, payment_status, payment_method, created_at";

pub const DONATION_COLS: &str =
    "id, payment_id, message, amount, camper_id, sponsor_id, created_at";

pub const SUBSCRIPTION_COLS: &str = "id, user_id, plan_id, status, frequency, payment_source_token, payment_id, customer_email, created_at, updated_at";

pub const REGISTRATION_COLS: &str = "id, name, lastname, email, phone, document, payment_reference, selected_course, num_seats, payment_date, created_at";

// ============ FromRow Implementations ============

impl FromRow for Payment {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Payment {
            id: row.get(0)?,
            reference: row.get(1)?,
            sponsor_id: row.get(2)?,
            user_id: row.get(3)?,
            amount: row.get(4)?,
            currency: row.get(5)?,
            payment_date: row.get(6)?,
            transaction_id: row.get(7)?,
            payment_status: parse_enum(row, 8, "payment_status")?,
            payment_method: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl FromRow for Donation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Donation {
            id: row.get(0)?,
            payment_id: row.get(1)?,
            message: row.get(2)?,
            amount: row.get(3)?,
            camper_id: row.get(4)?,
            sponsor_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for Subscription {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Subscription {
            id: row.get(0)?,
            user_id: row.get(1)?,
            plan_id: row.get(2)?,
            status: parse_enum(row, 3, "status")?,
            frequency: row.get(4)?,
            payment_source_token: row.get(5)?,
            payment_id: row.get(6)?,
            customer_email: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for Registration {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Registration {
            id: row.get(0)?,
            name: row.get(1)?,
            lastname: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            document: row.get(5)?,
            payment_reference: row.get(6)?,
            selected_course: row.get(7)?,
            num_seats: row.get(8)?,
            payment_date: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}
