use std::{env, sync::Arc};

use crate::error::{AppError, Res};

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database connection details, session token settings,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences and the Stripe credentials used by the
/// subscription reconciliation.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// Settings used to validate bearer session tokens.
    pub session: SessionConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// Maximum age (in seconds) of a webhook signature timestamp.
    pub webhook_tolerance_secs: i64,
    /// Number of webhook jobs that may wait for the background worker.
    pub webhook_queue_capacity: usize,
    /// Upper bound for an on-demand sync, provider call included.
    pub sync_timeout_secs: u64,
}

#[derive(Clone, Debug)]
/// Settings for validating session tokens (HS256 JWTs).
pub struct SessionConfig {
    /// The secret key used to verify session tokens.
    pub secret: String,
    /// Expected `aud` claim. When `None` the audience is not checked.
    pub audience: Option<String>,
}

fn required(name: &str) -> Res<String> {
    env::var(name).map_err(|_| AppError::Internal(format!("{} must be set", name)))
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    parse_or(name, env::var(name).ok(), default)
}

/// An unset variable takes the default silently; a malformed one is logged.
fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            log::warn!("{}={:?} is not valid, using the default", name, value);
            default
        }),
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the database
    /// - `JWT_SECRET`: Secret key used to verify session tokens
    /// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`: Stripe credentials
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `JWT_AUDIENCE`: Expected session token audience (default: not checked)
    /// - `SYNC_TIMEOUT_SECS`: On-demand sync timeout (default: 15)
    /// - `WEBHOOK_TOLERANCE_SECS`: Webhook signature tolerance (default: 300)
    /// - `WEBHOOK_QUEUE_CAPACITY`: Pending webhook jobs (default: 1024)
    ///
    /// Returns an error naming the first missing required variable.
    pub fn from_env() -> Res<Arc<Self>> {
        dotenvy::dotenv().ok();

        Ok(Arc::new(Config {
            environment: required("ENVIRONMENT")?,
            database_url: required("DATABASE_URL")?,
            session: SessionConfig {
                secret: required("JWT_SECRET")?,
                audience: env::var("JWT_AUDIENCE").ok().filter(|aud| !aud.is_empty()),
            },
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parsed_or("PORT", 8080),
            num_workers: parsed_or("WORKERS", 4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            webhook_tolerance_secs: parsed_or("WEBHOOK_TOLERANCE_SECS", 300),
            webhook_queue_capacity: parsed_or("WEBHOOK_QUEUE_CAPACITY", 1024),
            sync_timeout_secs: parsed_or("SYNC_TIMEOUT_SECS", 15),
        }))
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
