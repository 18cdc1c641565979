use serde::{Deserialize, Serialize};

/// Lifecycle states the gateway reports for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Declined,
    Voided,
    Error,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Declined => "DECLINED",
            Self::Voided => "VOIDED",
            Self::Error => "ERROR",
        }
    }

    /// Terminal statuses accept no further transition. A webhook for a
    /// reference already recorded in one of these is a re-delivery.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Normalize a raw gateway status. Absent or blank means the payment
    /// is still pending; anything unrecognized is recorded as ERROR
    /// rather than rejected, so the event is not lost.
    pub fn from_gateway(raw: Option<&str>) -> Self {
        let normalized = raw
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("PENDING")
            .to_uppercase();
        normalized.parse().unwrap_or_else(|_| {
            tracing::warn!(status = %normalized, "unrecognized gateway payment status");
            Self::Error
        })
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "DECLINED" => Ok(Self::Declined),
            "VOIDED" => Ok(Self::Voided),
            "ERROR" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One ledger row per gateway payment. `reference` is the business key the
/// gateway echoes back in webhooks; unique and immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub reference: String,
    pub sponsor_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Major currency units (gateway minor units / 100).
    pub amount: f64,
    pub currency: String,
    pub payment_date: i64,
    pub transaction_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub created_at: i64,
}

/// Data required to insert a payment row.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub reference: String,
    pub sponsor_id: Option<i64>,
    pub user_id: Option<i64>,
    pub amount: f64,
    pub currency: String,
    /// None means "now".
    pub payment_date: Option<i64>,
    pub transaction_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
}
