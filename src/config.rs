use std::env;
use thiserror::Error;

/// Admin accounts ensured at every startup unless `SEED_ADMINS` says otherwise.
pub const DEFAULT_ADMINS: [&str; 5] = ["Ahmed", "Alvee", "Junaid", "Abir", "Sir"];
pub const DEFAULT_ADMIN_PASSWORD: &str = "12345";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// AppConfig
///
/// Immutable once loaded and shared with handlers and extractors through
/// `FromRef`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Runtime environment marker. Controls the log format and the dev auth bypass.
    pub env: Env,
    /// Postgres connection string. `None` selects the embedded in-memory store.
    pub db_url: Option<String>,
    pub port: u16,
    pub admin_usernames: Vec<String>,
    pub admin_password: String,
}

/// Env
///
/// Local development versus a deployed service.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Local, embedded store, default admins. Used by the tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            port: DEFAULT_PORT,
            admin_usernames: DEFAULT_ADMINS.iter().map(|s| s.to_string()).collect(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment:
    /// `APP_ENV`, `DATABASE_URL`, `PORT`, `SEED_ADMINS`, `SEED_ADMIN_PASSWORD`.
    ///
    /// # Errors
    /// `ConfigError::Missing` when production runs without `DATABASE_URL`,
    /// `ConfigError::Invalid` for an unparsable `PORT`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        if env == Env::Production && db_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let port = match env::var("PORT") {
            Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: raw,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let admin_usernames = match env::var("SEED_ADMINS") {
            Ok(raw) => parse_list(&raw),
            Err(_) => DEFAULT_ADMINS.iter().map(|s| s.to_string()).collect(),
        };

        let admin_password =
            env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

        Ok(Self {
            env,
            db_url,
            port,
            admin_usernames,
            admin_password,
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
