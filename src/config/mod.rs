//! Application configuration loaded from environment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from `.env` and environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g. `0.0.0.0:4567`).
    pub server_addr: SocketAddr,
    /// Redis connection URL (e.g. `redis://127.0.0.1/`).
    pub redis_url: String,
    /// Credentials allowed to sign publish requests.
    pub apps: Vec<AppCredential>,
    /// Allowed clock skew between `auth_timestamp` and server time.
    pub timestamp_grace: Duration,
    /// Upper bound for a single bus publish.
    pub publish_timeout: Duration,
    /// Maximum accepted request body.
    pub max_body_bytes: usize,
    /// Log level: `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment. Call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let server_addr = std::env::var("SERVER_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:4567".to_string());
        let server_addr: SocketAddr = server_addr
            .parse()
            .map_err(|_| ConfigLoadError::InvalidServerAddr)?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());

        let app_id = std::env::var("APP_ID").unwrap_or_else(|_| "1".to_string());
        let app_key = std::env::var("APP_KEY").unwrap_or_else(|_| "notif_key".to_string());
        let app_secret =
            std::env::var("APP_SECRET").unwrap_or_else(|_| "notif_secret".to_string());
        let mut apps = vec![AppCredential::new(app_id, app_key, app_secret)];
        if let Ok(extra) = std::env::var("APPS") {
            apps.extend(parse_app_list(&extra)?);
        }

        let timestamp_grace =
            Duration::from_secs(env_number("AUTH_TIMESTAMP_GRACE_SECS", 600)?);
        let publish_timeout = Duration::from_millis(env_number("PUBLISH_TIMEOUT_MS", 5000)?);
        let max_body_bytes = env_number("MAX_BODY_BYTES", 10 * 1024)? as usize;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            server_addr,
            redis_url,
            apps,
            timestamp_grace,
            publish_timeout,
            max_body_bytes,
            log_level,
        })
    }

    /// Index the configured credentials by key.
    pub fn credential_store(&self) -> Result<CredentialStore, ConfigLoadError> {
        CredentialStore::new(self.apps.clone())
    }
}

fn env_number(name: &'static str, default: u64) -> Result<u64, ConfigLoadError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigLoadError::InvalidNumber(name)),
        Err(_) => Ok(default),
    }
}

/// Parse `id:key:secret` entries separated by commas. The secret may contain `:`.
pub fn parse_app_list(raw: &str) -> Result<Vec<AppCredential>, ConfigLoadError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut fields = entry.splitn(3, ':');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(id), Some(key), Some(secret))
                    if !id.is_empty() && !key.is_empty() && !secret.is_empty() =>
                {
                    Ok(AppCredential::new(id, key, secret))
                }
                _ => Err(ConfigLoadError::InvalidAppEntry(entry.to_string())),
            }
        })
        .collect()
}

/// Shared secret of one publishing application.
#[derive(Clone, PartialEq, Eq)]
pub struct AppCredential {
    pub app_id: String,
    pub key: String,
    pub secret: String,
}

impl AppCredential {
    pub fn new(
        app_id: impl Into<String>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            key: key.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for AppCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredential")
            .field("app_id", &self.app_id)
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Read-only lookup of credentials by `auth_key`.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    by_key: HashMap<String, AppCredential>,
}

impl CredentialStore {
    pub fn new(apps: Vec<AppCredential>) -> Result<Self, ConfigLoadError> {
        let mut by_key = HashMap::with_capacity(apps.len());
        for app in apps {
            if by_key.contains_key(&app.key) {
                return Err(ConfigLoadError::DuplicateKey(app.key));
            }
            by_key.insert(app.key.clone(), app);
        }
        Ok(Self { by_key })
    }

    pub fn find_by_key(&self, key: &str) -> Option<&AppCredential> {
        self.by_key.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Invalid SERVER_ADDR")]
    InvalidServerAddr,
    #[error("{0} must be a non-negative integer")]
    InvalidNumber(&'static str),
    #[error("Invalid APPS entry {0:?}, expected id:key:secret")]
    InvalidAppEntry(String),
    #[error("auth key {0:?} configured more than once")]
    DuplicateKey(String),
}
