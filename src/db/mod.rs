mod from_row;
pub mod queries;
mod schema;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::crypto::TokenCipher;
use crate::email::Mailer;
use crate::payments::WompiClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by all handlers.
///
/// Everything here is built once in main from the validated config;
/// request handlers never read the environment.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Outbound Wompi client; also computes/verifies checkout signatures.
    pub wompi: WompiClient,
    /// Envelope cipher for gateway payment-source ids.
    pub tokens: TokenCipher,
    pub mailer: Mailer,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
