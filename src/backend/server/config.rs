/**
 * Server Configuration
 *
 * Configuration is loaded from environment variables with defaults for
 * local development. Configuration errors are logged but do not
 * prevent startup: a server without `DATABASE_URL` runs on the
 * in-memory store.
 */

use crate::backend::auth::CloseAuthorizer;
use sqlx::PgPool;
use std::time::Duration;

/// Database configuration result
///
/// `None` means the database is not available and the in-memory store
/// is used instead.
pub type DatabaseConfig = Option<PgPool>;

/// Relay settings read once at startup
#[derive(Clone)]
pub struct ServerConfig {
    /// TCP port (SERVER_PORT, default 3000)
    pub port: u16,
    /// Shared JWT secret (JWT_SECRET)
    pub jwt_secret: String,
    /// Who may close a session (VIGIA_STAFF_CLOSE=true relaxes to
    /// owner-or-staff)
    pub close_authorizer: CloseAuthorizer,
    /// Upper bound for collaborator calls (PERSIST_TIMEOUT_MS,
    /// default 5000)
    pub persist_timeout: Duration,
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Self {
        let port = std::env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("Missing JWT_SECRET, using development default");
            "your-secret-key-change-in-production".to_string()
        });

        let close_authorizer = match std::env::var("VIGIA_STAFF_CLOSE").as_deref() {
            Ok("true") | Ok("1") => CloseAuthorizer::OwnerOrStaff,
            _ => CloseAuthorizer::OwnerOnly,
        };

        let persist_timeout = std::env::var("PERSIST_TIMEOUT_MS")
            .ok()
            .and_then(|ms| ms.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(5));

        Self {
            port,
            jwt_secret,
            close_authorizer,
            persist_timeout,
        }
    }
}

/// Load and initialize the database connection pool
///
/// Reads `DATABASE_URL`, connects, and runs migrations. Any failure is
/// logged and the function returns `None`, allowing the server to run
/// on the in-memory store.
pub async fn load_database() -> DatabaseConfig {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set. Using the in-memory store.");
            return None;
        }
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPool::connect(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Falling back to the in-memory store.");
            return None;
        }
    };

    tracing::info!("Database connection pool created successfully");

    tracing::info!("Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => {
            tracing::info!("Database migrations completed successfully");
        }
        Err(e) => {
            tracing::error!("Failed to run database migrations: {:?}", e);
            // Continue anyway - migrations might have already been run
            tracing::warn!("Continuing without migrations - database might not be up to date");
        }
    }

    Some(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Relies on the test environment not setting these variables
        let config = ServerConfig::from_env();
        assert_eq!(config.close_authorizer, CloseAuthorizer::OwnerOnly);
        assert_eq!(config.persist_timeout, Duration::from_secs(5));
    }
}
