use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// User-facing response messages. The frontend displays these verbatim,
/// in Spanish; keep wording stable.
pub mod msg {
    pub const INCOMPLETE_REQUEST: &str = "Datos incompletos en la solicitud.";
    pub const INVALID_SIGNATURE: &str = "Firma inválida.";
    pub const INTERNAL_ERROR: &str = "Error interno del servidor.";
    pub const GATEWAY_ERROR: &str = "Error del proveedor de pagos.";
    pub const INVALID_JSON: &str = "Solicitud JSON inválida.";

    pub const DONATION_SAVED: &str = "Datos guardados correctamente.";
    pub const WEBHOOK_RECEIVED: &str = "Webhook recibido exitosamente";
    pub const DUPLICATE_EVENT: &str = "Evento duplicado.";

    pub const MISSING_PAYMENT_TYPE: &str = "Tipo de medio de pago no definido";
    pub const MISSING_USER: &str = "Usuario no identificado en la solicitud.";
    pub const PAY_SOURCE_CREATED: &str = "Fuente de pago creada exitosamente";
    pub const SIGNATURE_GENERATED: &str = "Firma generada exitosamente";

    pub const REGISTRATION_SAVED: &str = "Registro guardado exitosamente";
    pub const REGISTRATIONS_FETCHED: &str = "Registros obtenidos exitosamente";
    pub const REGISTRATION_FETCHED: &str = "Registro obtenido exitosamente";
    pub const REGISTRATION_NOT_FOUND: &str = "Registro no encontrado";
    pub const CONFIRMED_COUNT_FETCHED: &str = "Total de Registros Exitosos obtenidos exitosamente";

    pub const WELCOME_EMAIL_FAILED: &str = "Error al enviar el correo de bienvenida";
    pub const NOTIFICATION_EMAIL_FAILED: &str = "Error al enviar el correo de notificación";
    pub const EMAILS_SENT: &str = "Correo de confirmación y notificación enviados correctamente";

    /// Per-field validation message, mirrored by the frontend's form labels.
    pub fn missing_field(field: &str) -> String {
        format!("Falta el campo {}", field)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Gateway returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Gateway unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}: {detail}")]
    Email { message: String, detail: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error envelope. Same shape as the success envelope the sync endpoints
/// return, with `success: false` and `data: null` serialized explicitly
/// so the frontend can destructure unconditionally.
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
    data: Option<serde_json::Value>,
    error: Option<String>,
}

// Extractor rejections surface as validation errors so malformed bodies
// produce the envelope instead of axum's plaintext default.
impl From<JsonRejection> for AppError {
    fn from(rej: JsonRejection) -> Self {
        AppError::Validation(rej.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rej: QueryRejection) -> Self {
        AppError::Validation(rej.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rej: PathRejection) -> Self {
        AppError::Validation(rej.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // User-facing messages stay in Spanish: the frontend this serves
        // displays them verbatim.
        let (status, message, error) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::SignatureMismatch => {
                tracing::warn!("signature mismatch on inbound payload (possible tampering)");
                (
                    StatusCode::BAD_REQUEST,
                    msg::INVALID_SIGNATURE.to_string(),
                    None,
                )
            }
            AppError::Upstream { status, body } => {
                tracing::error!(status, "gateway rejected request: {}", body);
                (
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    msg::GATEWAY_ERROR.to_string(),
                    Some(body.clone()),
                )
            }
            AppError::Transport(e) => {
                tracing::error!("gateway unreachable: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg::INTERNAL_ERROR.to_string(),
                    None,
                )
            }
            AppError::Crypto(detail) => {
                tracing::error!("crypto error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg::INTERNAL_ERROR.to_string(),
                    None,
                )
            }
            AppError::Database(e) => {
                tracing::error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg::INTERNAL_ERROR.to_string(),
                    None,
                )
            }
            AppError::Pool(e) => {
                tracing::error!("pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg::INTERNAL_ERROR.to_string(),
                    None,
                )
            }
            AppError::Json(e) => (
                StatusCode::BAD_REQUEST,
                msg::INVALID_JSON.to_string(),
                Some(e.to_string()),
            ),
            AppError::Email { message, detail } => {
                tracing::error!("email delivery failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    message.clone(),
                    Some(detail.clone()),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    msg::INTERNAL_ERROR.to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            message,
            data: None,
            error,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
