use serde::{Deserialize, Serialize};

/// A donation row. `payment_id` holds the parent payment's reference; the
/// two rows are only ever created inside the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub payment_id: String,
    pub message: String,
    pub amount: f64,
    pub camper_id: Option<i64>,
    pub sponsor_id: Option<i64>,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub payment_id: String,
    pub message: String,
    pub amount: f64,
    pub camper_id: Option<i64>,
    pub sponsor_id: Option<i64>,
}
