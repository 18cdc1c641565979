use serde::{Deserialize, Serialize};

use crate::error::{msg, AppError, Result};

/// A course-registration row captured by the landing form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub document: String,
    /// Gateway reference of the payment that will confirm this row.
    pub payment_reference: String,
    pub selected_course: String,
    pub num_seats: i64,
    /// Stamped when the matching payment is approved; None until then.
    /// A non-null value marks the registration confirmed.
    pub payment_date: Option<i64>,
    pub created_at: i64,
}

/// Checks required fields in declaration order so the first missing one
/// is the one reported, matching the frontend's form flow.
fn first_missing(fields: &[(&str, Option<&str>)]) -> Option<String> {
    for (name, value) in fields {
        match value {
            Some(v) if !v.trim().is_empty() => continue,
            _ => return Some(msg::missing_field(name)),
        }
    }
    None
}

#[derive(Debug, Deserialize)]
pub struct CreateRegistration {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub selected_course: Option<String>,
    #[serde(default, rename = "numSeats")]
    pub num_seats: Option<i64>,
}

impl CreateRegistration {
    pub fn validate(&self) -> Result<()> {
        let missing = first_missing(&[
            ("name", self.name.as_deref()),
            ("lastname", self.lastname.as_deref()),
            ("email", self.email.as_deref()),
            ("phone", self.phone.as_deref()),
            ("document", self.document.as_deref()),
            ("payment_reference", self.payment_reference.as_deref()),
            ("selected_course", self.selected_course.as_deref()),
        ]);
        match missing {
            Some(m) => Err(AppError::Validation(m)),
            None => Ok(()),
        }
    }
}

/// Body for the notify endpoint: re-sends the welcome email and the
/// internal notification for a registration.
#[derive(Debug, Deserialize)]
pub struct NotifyRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub selected_course: Option<String>,
    #[serde(default, rename = "paymentMethod")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, rename = "contactEmail")]
    pub contact_email: Option<String>,
}

impl NotifyRequest {
    pub fn validate(&self) -> Result<()> {
        let missing = first_missing(&[
            ("name", self.name.as_deref()),
            ("lastname", self.lastname.as_deref()),
            ("email", self.email.as_deref()),
            ("phone", self.phone.as_deref()),
            ("document", self.document.as_deref()),
            ("selected_course", self.selected_course.as_deref()),
        ]);
        match missing {
            Some(m) => Err(AppError::Validation(m)),
            None => Ok(()),
        }
    }
}
