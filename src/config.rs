use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "CareLog";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PORT: u16 = 5000;
pub const MIN_SECRET_LENGTH: usize = 32;

/// Uploads larger than this are rejected with 413.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JWT_SECRET is not set")]
    MissingSecret,
    #[error("JWT_SECRET must be at least {MIN_SECRET_LENGTH} bytes")]
    WeakSecret,
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Cannot determine home directory; set {0}")]
    NoHomeDir(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Outbound mail settings. Without a relay URL mail is only logged.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub relay_url: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
    /// Recipient of contact-form messages.
    pub inbox: String,
}

#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub port: u16,
    pub environment: Environment,
    pub mail: MailConfig,
    pub admin: Option<AdminBootstrap>,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::MissingSecret)?;
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::WeakSecret);
        }

        let database_path = match get("CARELOG_DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => app_data_dir()
                .ok_or(ConfigError::NoHomeDir("CARELOG_DATABASE_PATH"))?
                .join("carelog.db"),
        };
        let upload_dir = match get("CARELOG_UPLOAD_DIR") {
            Some(path) => PathBuf::from(path),
            None => app_data_dir()
                .ok_or(ConfigError::NoHomeDir("CARELOG_UPLOAD_DIR"))?
                .join("uploads"),
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let environment = match get("CARELOG_ENV").as_deref() {
            Some("PROD") => Environment::Production,
            _ => Environment::Development,
        };

        let frontend_url = get("FRONTEND_URL")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        let user = get("MAIL_USER");
        let from = get("MAIL_FROM")
            .or_else(|| user.clone())
            .unwrap_or_else(|| "no-reply@carelog.local".into());
        let mail = MailConfig {
            relay_url: get("MAIL_RELAY_URL"),
            inbox: user.clone().unwrap_or_else(|| from.clone()),
            user,
            pass: get("MAIL_PASS"),
            from,
        };

        let admin = match (get("CARELOG_ADMIN_EMAIL"), get("CARELOG_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            _ => None,
        };

        Ok(Self {
            database_path,
            upload_dir,
            jwt_secret,
            frontend_url,
            port,
            environment,
            mail,
            admin,
        })
    }
}

/// Get the application data directory: ~/CareLog/
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Fallback tracing filter when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "carelog=info,tower_http=info"
}
