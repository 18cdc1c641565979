//! Email delivery for registration confirmations.
//!
//! Two modes:
//! 1. Send via Resend API (default when API key available)
//! 2. Disabled (no email sent, log only)

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Retry delays in seconds (exponential backoff: 1s, 4s, 16s)
const RETRY_DELAYS: &[u64] = &[1, 4, 16];

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Format a Unix timestamp as a human-readable date (e.g., "15/01/2024")
fn format_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "fecha desconocida".to_string())
}

/// Result of attempting to send an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    /// Email was sent successfully via Resend
    Sent,
    /// No recipient address available (request carried none and no default is configured)
    NoRecipient,
    /// No API key configured, delivery skipped
    NoApiKey,
}

/// Details for the staff notification sent after a registration is paid.
pub struct NotificationDetails<'a> {
    pub email: &'a str,
    pub full_name: &'a str,
    pub phone: &'a str,
    pub document: &'a str,
    pub selected_course: &'a str,
    pub payment_method: Option<&'a str>,
    pub amount: Option<f64>,
    /// Overrides the configured notification recipient when present
    pub contact_email: Option<&'a str>,
}

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: String,
    text: String,
    html: String,
}

/// Resend API response.
#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

/// Email sender backed by the Resend API.
#[derive(Clone)]
pub struct Mailer {
    /// Resend API key (from ENV); None disables delivery
    api_key: Option<String>,
    /// "From" email address (from ENV)
    from_email: String,
    /// Default recipient for staff notifications (from ENV)
    notify_to: Option<String>,
    /// HTTP client for API calls
    http_client: Client,
}

impl Mailer {
    /// Create a new mailer with the optional API key, from address and
    /// default notification recipient.
    pub fn new(api_key: Option<String>, from_email: String, notify_to: Option<String>) -> Self {
        Self {
            api_key,
            from_email,
            notify_to,
            http_client: Client::new(),
        }
    }

    /// Send the welcome email to a student whose registration was paid.
    pub async fn send_welcome_email(
        &self,
        to_email: &str,
        full_name: &str,
        course: &str,
    ) -> Result<EmailSendResult> {
        let Some(ref api_key) = self.api_key else {
            tracing::warn!(to = %to_email, "No Resend API key configured, skipping welcome email");
            return Ok(EmailSendResult::NoApiKey);
        };

        let subject = format!("Confirmación de inscripción - {}", course);
        let text = format!(
            "Hola {},\n\n¡Bienvenido! Tu pago fue recibido y tu inscripción al curso {} quedó confirmada.\n\nEn los próximos días recibirás por este medio la información de acceso y la fecha de inicio.\n\nSi tienes alguna pregunta, responde a este correo.\n\nNos vemos en clase.",
            full_name, course
        );
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">¡Bienvenido, {}!</h2>
<p>Tu pago fue recibido y tu inscripción al curso <strong>{}</strong> quedó confirmada.</p>
<p>En los próximos días recibirás por este medio la información de acceso y la fecha de inicio.</p>
<p style="color: #666;">Si tienes alguna pregunta, responde a este correo.</p>
<hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
<p style="color: #999; font-size: 12px;">Nos vemos en clase.</p>
</body>
</html>"#,
            full_name, course
        );

        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![to_email],
            subject,
            text,
            html,
        };

        self.send_request_with_retry(api_key, &request, to_email)
            .await
    }

    /// Send the staff notification for a paid registration.
    ///
    /// The recipient is the request's contact email when present, otherwise
    /// the configured default.
    pub async fn send_notification_email(
        &self,
        details: &NotificationDetails<'_>,
    ) -> Result<EmailSendResult> {
        let Some(ref api_key) = self.api_key else {
            tracing::warn!("No Resend API key configured, skipping notification email");
            return Ok(EmailSendResult::NoApiKey);
        };

        let Some(to_email) = details.contact_email.or(self.notify_to.as_deref()) else {
            tracing::warn!(
                student = %details.email,
                "No notification recipient available, skipping notification email"
            );
            return Ok(EmailSendResult::NoRecipient);
        };

        let date = format_date(Utc::now().timestamp());
        let payment_method = details.payment_method.unwrap_or("No informado");
        let amount = details
            .amount
            .map(|a| format!("${:.2}", a))
            .unwrap_or_else(|| "No informado".to_string());

        let subject = format!("Nueva inscripción confirmada - {}", details.selected_course);
        let text = format!(
            "Nueva inscripción confirmada ({})\n\nCurso: {}\nNombre: {}\nCorreo: {}\nTeléfono: {}\nDocumento: {}\nMedio de pago: {}\nMonto: {}",
            date,
            details.selected_course,
            details.full_name,
            details.email,
            details.phone,
            details.document,
            payment_method,
            amount
        );
        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2 style="color: #333;">Nueva inscripción confirmada</h2>
<p style="color: #666;">{}</p>
<table style="border-collapse: collapse; width: 100%;">
<tr><td style="padding: 8px; border-bottom: 1px solid #eee;"><strong>Curso</strong></td><td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td></tr>
<tr><td style="padding: 8px; border-bottom: 1px solid #eee;"><strong>Nombre</strong></td><td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td></tr>
<tr><td style="padding: 8px; border-bottom: 1px solid #eee;"><strong>Correo</strong></td><td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td></tr>
<tr><td style="padding: 8px; border-bottom: 1px solid #eee;"><strong>Teléfono</strong></td><td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td></tr>
<tr><td style="padding: 8px; border-bottom: 1px solid #eee;"><strong>Documento</strong></td><td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td></tr>
<tr><td style="padding: 8px; border-bottom: 1px solid #eee;"><strong>Medio de pago</strong></td><td style="padding: 8px; border-bottom: 1px solid #eee;">{}</td></tr>
<tr><td style="padding: 8px;"><strong>Monto</strong></td><td style="padding: 8px;">{}</td></tr>
</table>
</body>
</html>"#,
            date,
            details.selected_course,
            details.full_name,
            details.email,
            details.phone,
            details.document,
            payment_method,
            amount
        );

        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![to_email],
            subject,
            text,
            html,
        };

        self.send_request_with_retry(api_key, &request, to_email)
            .await
    }

    /// Send a request to Resend API with exponential backoff retry.
    ///
    /// Retries on transient errors (network issues, 5xx, 429 rate limit).
    /// Fails immediately on non-transient errors (4xx except 429).
    async fn send_request_with_retry(
        &self,
        api_key: &str,
        request: &ResendEmailRequest<'_>,
        to_email: &str,
    ) -> Result<EmailSendResult> {
        let mut last_error: Option<AppError> = None;

        for (attempt, delay_secs) in std::iter::once(&0u64).chain(RETRY_DELAYS).enumerate() {
            // Sleep before retry (skip on first attempt)
            if *delay_secs > 0 {
                tracing::warn!(
                    attempt,
                    delay_secs,
                    "Retrying email send after transient failure"
                );
                tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
            }

            match self.send_resend_request(api_key, request).await {
                Ok(()) => {
                    if attempt > 0 {
                        tracing::info!(
                            attempt,
                            to = %to_email,
                            "Email sent successfully after retry"
                        );
                    } else {
                        tracing::info!(to = %to_email, "Email sent via Resend");
                    }
                    return Ok(EmailSendResult::Sent);
                }
                Err((error, is_transient)) => {
                    if is_transient {
                        last_error = Some(error);
                        // Continue to next retry
                    } else {
                        // Non-transient error, fail immediately
                        return Err(error);
                    }
                }
            }
        }

        // All retries exhausted
        tracing::error!(
            to = %to_email,
            attempts = RETRY_DELAYS.len() + 1,
            "Email send failed after all retries"
        );
        Err(last_error.unwrap_or_else(|| {
            AppError::Internal("Email service error: all retries exhausted".into())
        }))
    }

    /// Send a single request to Resend API.
    ///
    /// Returns Ok(()) on success, or Err((AppError, is_transient)) on failure.
    async fn send_resend_request(
        &self,
        api_key: &str,
        request: &ResendEmailRequest<'_>,
    ) -> std::result::Result<(), (AppError, bool)> {
        let response = self
            .http_client
            .post(RESEND_API_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to send request to Resend API");
                // Network errors are transient
                (
                    AppError::Internal(format!("Email service error: {}", e)),
                    true,
                )
            })?;

        let status = response.status();

        if status.is_success() {
            let _result: ResendEmailResponse = response.json().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to parse Resend API response");
                // Parse errors after success are weird but not transient
                (AppError::Internal("Email service response error".into()), false)
            })?;
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();

            // Determine if error is transient (should retry)
            let is_transient = status.as_u16() == 429 // Rate limited
                || status.is_server_error(); // 5xx errors

            if is_transient {
                tracing::warn!(
                    status = %status,
                    body = %body,
                    "Resend API returned transient error"
                );
            } else {
                tracing::error!(
                    status = %status,
                    body = %body,
                    "Resend API returned non-transient error"
                );
            }

            Err((
                AppError::Internal(format!("Email service error: {} - {}", status, body)),
                is_transient,
            ))
        }
    }
}
