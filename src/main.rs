use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::time::Duration;

use caja::config::Config;
use caja::crypto::TokenCipher;
use caja::db::{create_pool, init_db, queries, AppState};
use caja::email::Mailer;
use caja::handlers;
use caja::payments::WompiClient;

/// Processed-event markers only defend against gateway redelivery, which
/// stops after a few days; anything older is dead weight.
const WEBHOOK_EVENT_RETENTION_DAYS: i64 = 30;

#[derive(Parser, Debug)]
#[command(name = "caja")]
#[command(about = "Payment processing backend for the Wompi gateway")]
struct Cli {
    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,

    /// Print a fresh base64 token-encryption key and exit
    #[arg(long)]
    generate_key: bool,
}

fn spawn_purge_task(state: AppState) {
    tokio::spawn(async move {
        let interval = Duration::from_secs(24 * 60 * 60);

        loop {
            tokio::time::sleep(interval).await;

            match state.db.get() {
                Ok(conn) => {
                    match queries::purge_old_webhook_events(&conn, WEBHOOK_EVENT_RETENTION_DAYS) {
                        Ok(count) => {
                            if count > 0 {
                                tracing::debug!("Purged {} processed webhook events", count);
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed to purge webhook events: {}", e);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to get db connection for purge: {}", e);
                }
            }
        }
    });

    tracing::info!("Background webhook-event purge task started (runs daily)");
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Key generation runs before normal startup (no env needed)
    if cli.generate_key {
        println!("{}", TokenCipher::generate());
        return;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caja=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; missing credentials are fatal at startup,
    // never a per-request surprise
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    // Create database connection pool
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");

    // Initialize database schema
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        wompi: WompiClient::new(&config),
        tokens: config.token_key.clone(),
        mailer: Mailer::new(
            config.resend_api_key.clone(),
            config.email_from.clone(),
            config.notify_email.clone(),
        ),
    };

    // Purge stale webhook-event markers on startup
    {
        let conn = state.db.get().expect("Failed to get connection for purge");
        match queries::purge_old_webhook_events(&conn, WEBHOOK_EVENT_RETENTION_DAYS) {
            Ok(count) if count > 0 => {
                tracing::info!(
                    "Purged {} processed webhook events older than {} days",
                    count,
                    WEBHOOK_EVENT_RETENTION_DAYS
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to purge old webhook events: {}", e);
            }
        }
    }

    // Start background purge task
    spawn_purge_task(state.clone());

    // Build the application router
    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    // Track if we should clean up on exit
    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Caja server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    // Cleanup on exit if ephemeral mode
    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        // Also remove WAL and SHM files if they exist
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
