//! Course-registration CRUD and the post-payment notification emails.
//!
//! Registrations arrive from the landing form with payment_date NULL and
//! are confirmed later by the webhook for their payment reference.

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::db::{queries, AppState};
use crate::email::{EmailSendResult, NotificationDetails};
use crate::error::{msg, AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::models::{CreateRegistration, NotifyRequest, Registration};

use super::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub course: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ConfirmedCount {
    pub total: i64,
}

pub async fn save_registration(
    State(state): State<AppState>,
    Json(request): Json<CreateRegistration>,
) -> Result<Json<ApiResponse<()>>> {
    request.validate()?;

    let conn = state.db.get()?;
    let registration = queries::insert_registration(&conn, &request)?;

    tracing::info!(
        id = %registration.id,
        course = %registration.selected_course,
        reference = %registration.payment_reference,
        "registration saved (awaiting payment)"
    );

    Ok(ApiResponse::message(msg::REGISTRATION_SAVED))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<Registration>>>> {
    let conn = state.db.get()?;
    let registrations = queries::list_registrations(&conn, params.course.as_deref())?;

    Ok(ApiResponse::ok(msg::REGISTRATIONS_FETCHED, registrations))
}

pub async fn get_registration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Registration>>> {
    let conn = state.db.get()?;
    let registration = queries::get_registration_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound(msg::REGISTRATION_NOT_FOUND.into()))?;

    Ok(ApiResponse::ok(msg::REGISTRATION_FETCHED, registration))
}

pub async fn confirmed_count(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<ConfirmedCount>>> {
    let conn = state.db.get()?;
    let total = queries::count_confirmed_registrations(&conn, params.course.as_deref())?;

    Ok(ApiResponse::ok(
        msg::CONFIRMED_COUNT_FETCHED,
        ConfirmedCount { total },
    ))
}

/// Re-send the welcome email plus the internal notification for a paid
/// registration. Sequential on purpose: if the welcome email fails, the
/// staff notification is not sent and the caller retries the whole pair.
pub async fn send_notifications(
    State(state): State<AppState>,
    Json(request): Json<NotifyRequest>,
) -> Result<Json<ApiResponse<()>>> {
    request.validate()?;

    // Validated above; the defaults never fire.
    let email = request.email.as_deref().unwrap_or_default();
    let full_name = format!(
        "{} {}",
        request.name.as_deref().unwrap_or_default(),
        request.lastname.as_deref().unwrap_or_default()
    );
    let course = request.selected_course.as_deref().unwrap_or_default();

    match state.mailer.send_welcome_email(email, &full_name, course).await {
        Ok(EmailSendResult::Sent) => {}
        Ok(skipped) => {
            return Err(AppError::Email {
                message: msg::WELCOME_EMAIL_FAILED.to_string(),
                detail: format!("delivery skipped: {:?}", skipped),
            });
        }
        Err(e) => {
            return Err(AppError::Email {
                message: msg::WELCOME_EMAIL_FAILED.to_string(),
                detail: e.to_string(),
            });
        }
    }

    let details = NotificationDetails {
        email,
        full_name: &full_name,
        phone: request.phone.as_deref().unwrap_or_default(),
        document: request.document.as_deref().unwrap_or_default(),
        selected_course: course,
        payment_method: request.payment_method.as_deref(),
        amount: request.amount,
        contact_email: request.contact_email.as_deref(),
    };
    match state.mailer.send_notification_email(&details).await {
        Ok(EmailSendResult::Sent) => {}
        Ok(skipped) => {
            return Err(AppError::Email {
                message: msg::NOTIFICATION_EMAIL_FAILED.to_string(),
                detail: format!("delivery skipped: {:?}", skipped),
            });
        }
        Err(e) => {
            return Err(AppError::Email {
                message: msg::NOTIFICATION_EMAIL_FAILED.to_string(),
                detail: e.to_string(),
            });
        }
    }

    Ok(ApiResponse::message(msg::EMAILS_SENT))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/registrations",
            post(save_registration).get(list_registrations),
        )
        .route("/registrations/confirmed/count", get(confirmed_count))
        .route("/registrations/notify", post(send_notifications))
        .route("/registrations/{id}", get(get_registration))
}
