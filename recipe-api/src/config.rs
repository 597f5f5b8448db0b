/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8000)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `DATABASE_URL`: SQLite connection string (default: sqlite://recipe.db?mode=rwc)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_CONNECT_RETRIES`: Connection attempts at startup (default: unbounded)
/// - `DATABASE_RETRY_INTERVAL_SECS`: Delay between attempts (default: 1)
/// - `MEDIA_ROOT`: Directory uploaded files are written to (default: media)
/// - `MEDIA_URL`: URL prefix uploaded files are served under (default: /media)
/// - `MAX_UPLOAD_BYTES`: Largest accepted request body (default: 10 MiB)
/// - `ADMIN_EMAIL` / `ADMIN_PASSWORD`: Superuser created at startup if missing
/// - `RUST_LOG`: Log filter (default: recipe_api=debug,recipe_shared=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use recipe_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Uploaded media configuration
    pub media: MediaConfig,

    /// Superuser to create at startup
    pub admin: Option<AdminConfig>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins ("*" allows any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Connection attempts before startup fails (None = keep trying)
    pub connect_retries: Option<u32>,

    /// Delay between connection attempts
    pub retry_interval_secs: u64,
}

/// Uploaded media configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory uploads are written below
    pub root: PathBuf,

    /// URL prefix uploads are served under
    pub url: String,

    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

/// Bootstrap superuser
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: String,

    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "sqlite://recipe.db?mode=rwc".to_string(),
                max_connections: 10,
                connect_retries: None,
                retry_interval_secs: 1,
            },
            media: MediaConfig {
                root: PathBuf::from("media"),
                url: "/media".to_string(),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            admin: None,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// Every variable is optional; unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A numeric variable does not parse
    /// - Only one of `ADMIN_EMAIL` / `ADMIN_PASSWORD` is set
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let cors_origins = match env::var("CORS_ORIGINS") {
            Ok(origins) => origins
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            Err(_) => defaults.api.cors_origins,
        };

        let connect_retries = match env::var("DATABASE_CONNECT_RETRIES") {
            Ok(value) => Some(value.parse::<u32>().map_err(|e| {
                anyhow::anyhow!("DATABASE_CONNECT_RETRIES must be a number: {}", e)
            })?),
            Err(_) => None,
        };

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminConfig { email, password }),
            (Err(_), Err(_)) => None,
            _ => anyhow::bail!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or(defaults.api.host),
                port: parse_var("API_PORT", defaults.api.port)?,
                cors_origins,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_var(
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                connect_retries,
                retry_interval_secs: parse_var(
                    "DATABASE_RETRY_INTERVAL_SECS",
                    defaults.database.retry_interval_secs,
                )?,
            },
            media: MediaConfig {
                root: env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.media.root),
                url: env::var("MEDIA_URL").unwrap_or(defaults.media.url),
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.media.max_upload_bytes)?,
            },
            admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Delay between database connection attempts
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.database.retry_interval_secs)
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, value, e)),
        Err(_) => Ok(default),
    }
}
