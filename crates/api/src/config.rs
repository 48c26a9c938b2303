//! Application configuration loaded from environment variables.

/// Development signing key used when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

/// Longest accepted bearer token lifetime: one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Credentials for the admin account created at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on the in-memory store
/// - `JWT_SECRET`: token signing key (default: a development key)
/// - `TOKEN_TTL_HOURS`: bearer token lifetime, 1 to [`MAX_TOKEN_TTL_HOURS`] (default: `24`)
/// - `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD`: optional bootstrap admin
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub seed_admin: Option<SeedAdmin>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            _ => None,
        };

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: get("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            database_url: get("DATABASE_URL").filter(|url| !url.is_empty()),
            jwt_secret: get("JWT_SECRET")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.jwt_secret),
            token_ttl_hours: get("TOKEN_TTL_HOURS")
                .and_then(|h| h.parse().ok())
                .filter(|h| (1..=MAX_TOKEN_TTL_HOURS).contains(h))
                .unwrap_or(defaults.token_ttl_hours),
            seed_admin,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if tokens are signed with the built-in development key.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            seed_admin: None,
        }
    }
}
