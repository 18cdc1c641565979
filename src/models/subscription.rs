use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's recurring-payment subscription. One row per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user_id: i64,
    pub plan_id: Option<String>,
    pub status: SubscriptionStatus,
    pub frequency: Option<String>,
    /// Envelope-encrypted gateway payment-source id. Never stored or
    /// exposed in plaintext.
    #[serde(skip_serializing)]
    pub payment_source_token: Option<String>,
    /// Reference of the latest payment applied to this subscription.
    pub payment_id: Option<String>,
    pub customer_email: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: i64,
    pub plan_id: Option<String>,
    pub status: SubscriptionStatus,
    pub frequency: Option<String>,
    pub payment_source_token: Option<String>,
    pub payment_id: Option<String>,
    pub customer_email: Option<String>,
}
