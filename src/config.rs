use std::env;

use crate::crypto::TokenCipher;

/// Process configuration, read once at startup and passed explicitly.
///
/// All Wompi credentials are required: refusing to start beats limping
/// along and rejecting every request at runtime.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Base URL of the Wompi API, e.g. https://production.wompi.co/v1
    pub wompi_url: String,
    pub wompi_public_key: String,
    pub wompi_private_key: String,
    pub wompi_integrity_key: String,
    /// Key for envelope-encrypting gateway payment-source ids.
    pub token_key: TokenCipher,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    /// Internal recipient for registration notification emails.
    pub notify_email: Option<String>,
    pub dev_mode: bool,
}

fn required(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{} is not set", name))
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("CAJA_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("CAJA_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("CAJA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let wompi_url = required("WOMPI_URL")?;
        let wompi_public_key = required("WOMPI_PUBLIC_KEY")?;
        let wompi_private_key = required("WOMPI_PRIVATE_KEY")?;
        let wompi_integrity_key = required("WOMPI_INTEGRITY_KEY")?;

        let token_key = TokenCipher::from_base64(&required("CAJA_TOKEN_KEY")?)
            .map_err(|e| format!("CAJA_TOKEN_KEY is invalid: {}", e))?;

        Ok(Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "caja.db".to_string()),
            wompi_url,
            wompi_public_key,
            wompi_private_key,
            wompi_integrity_key,
            token_key,
            resend_api_key: env::var("RESEND_API_KEY").ok(),
            email_from: env::var("CAJA_EMAIL_FROM")
                .unwrap_or_else(|_| "Caja <pagos@caja.dev>".to_string()),
            notify_email: env::var("CAJA_NOTIFY_EMAIL").ok(),
            dev_mode,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
