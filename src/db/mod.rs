use std::time::{Duration, Instant};

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Serialize;

/// Open the connection pool used by every request handler.
///
/// `SQLite` URLs get a single connection so that in-memory databases are shared
/// across the whole pool.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut opts = ConnectOptions::new(database_url);

    if database_url.starts_with("sqlite:") {
        opts.max_connections(1).min_connections(1);
    } else {
        opts.max_connections(20).min_connections(2);
    }

    opts.connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;
    Ok(db)
}

/// Result of a database round-trip check.
#[derive(Debug, Serialize)]
pub struct DbHealth {
    pub connected: bool,
    pub latency_ms: u64,
}

/// Ping the database and measure the round-trip latency.
pub async fn check_health(db: &DatabaseConnection) -> DbHealth {
    let started = Instant::now();
    let connected = match db.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Database ping failed");
            false
        }
    };

    DbHealth {
        connected,
        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    }
}
