//! Configuration module
//!
//! Configuration is read once at startup from the environment (with `.env`
//! support) and handed to the coordinator as an immutable value. Nothing in the
//! upload path reads ambient global state.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_HOSTNAME_COMMAND, DEFAULT_REPLICATION_CONNECT_TIMEOUT_SECS, DEFAULT_REPLICATION_PORT,
    DEFAULT_S3_REGION, DEFAULT_S3_REQUEST_TIMEOUT_SECS, DEFAULT_UPLOADS_PATH,
    MAX_SYNC_UPLOAD_BYTES,
};

const SERVER_PORT: u16 = 4000;
const MAX_BODY_SIZE_MB: usize = 1024;

/// Object-store settings.
///
/// The first four fields are required for the object-store path; if any of
/// them is missing or empty every upload stays local.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub bucket_name: Option<String>,
    pub url_ttl_seconds: Option<u64>,
    pub async_long_uploads_enabled: bool,
    pub size_threshold_bytes: u64,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub endpoint: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            bucket_name: None,
            url_ttl_seconds: None,
            async_long_uploads_enabled: false,
            size_threshold_bytes: MAX_SYNC_UPLOAD_BYTES,
            region: DEFAULT_S3_REGION.to_string(),
            endpoint: None,
            request_timeout_seconds: DEFAULT_S3_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

impl StorageConfig {
    /// All required credential and bucket fields are present and non-empty.
    pub fn is_object_store_eligible(&self) -> bool {
        present(&self.access_key_id)
            && present(&self.secret_access_key)
            && present(&self.bucket_name)
            && self.url_ttl_seconds.is_some_and(|ttl| ttl > 0)
    }

    /// Whether a file of `size` bytes is deferred to an asynchronous push.
    pub fn is_long_upload(&self, size: u64) -> bool {
        self.is_object_store_eligible()
            && self.async_long_uploads_enabled
            && size > self.size_threshold_bytes
    }

    pub fn url_ttl(&self) -> Option<Duration> {
        self.url_ttl_seconds.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Self {
            access_key_id: env_opt("S3_ACCESS_KEY_ID"),
            secret_access_key: env_opt("S3_SECRET_ACCESS_KEY"),
            bucket_name: env_opt("S3_BUCKET"),
            url_ttl_seconds: match env_opt("S3_URL_TTL_SECONDS") {
                Some(raw) => Some(raw.parse().map_err(|_| {
                    anyhow::anyhow!("S3_URL_TTL_SECONDS must be a whole number of seconds")
                })?),
                None => None,
            },
            async_long_uploads_enabled: env_bool("ASYNC_LONG_UPLOADS", false),
            size_threshold_bytes: env_parse("SYNC_UPLOAD_MAX_BYTES", MAX_SYNC_UPLOAD_BYTES),
            region: env_opt("S3_REGION")
                .or_else(|| env_opt("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            endpoint: env_opt("S3_ENDPOINT"),
            request_timeout_seconds: env_parse(
                "S3_REQUEST_TIMEOUT_SECONDS",
                DEFAULT_S3_REQUEST_TIMEOUT_SECS,
            ),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.url_ttl_seconds == Some(0) {
            return Err(anyhow::anyhow!("S3_URL_TTL_SECONDS must be greater than 0"));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "S3_REQUEST_TIMEOUT_SECONDS must be greater than 0"
            ));
        }
        Ok(())
    }
}

/// Best-effort mirror settings.
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    pub enabled: bool,
    pub pool_a_host: Option<String>,
    pub pool_b_host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_seconds: u64,
    pub local_hostname_probe_command: String,
    /// Root of the mirrored layout on the remote host. Defaults to the local
    /// uploads root so paths are replicated verbatim.
    pub remote_uploads_root: Option<PathBuf>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pool_a_host: None,
            pool_b_host: None,
            port: DEFAULT_REPLICATION_PORT,
            username: None,
            password: None,
            connect_timeout_seconds: DEFAULT_REPLICATION_CONNECT_TIMEOUT_SECS,
            local_hostname_probe_command: DEFAULT_HOSTNAME_COMMAND.to_string(),
            remote_uploads_root: None,
        }
    }
}

impl ReplicationConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        Ok(Self {
            enabled: env_bool("REPLICATION_ENABLED", false),
            pool_a_host: env_opt("REPLICATION_POOL_A_HOST"),
            pool_b_host: env_opt("REPLICATION_POOL_B_HOST"),
            port: env::var("REPLICATION_PORT")
                .unwrap_or_else(|_| DEFAULT_REPLICATION_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REPLICATION_PORT must be a valid port number"))?,
            username: env_opt("REPLICATION_USERNAME"),
            password: env_opt("REPLICATION_PASSWORD"),
            connect_timeout_seconds: env_parse(
                "REPLICATION_CONNECT_TIMEOUT_SECONDS",
                DEFAULT_REPLICATION_CONNECT_TIMEOUT_SECS,
            ),
            local_hostname_probe_command: env_opt("REPLICATION_HOSTNAME_COMMAND")
                .unwrap_or_else(|| DEFAULT_HOSTNAME_COMMAND.to_string()),
            remote_uploads_root: env_opt("REPLICATION_REMOTE_UPLOADS_PATH").map(PathBuf::from),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.enabled {
            return Ok(());
        }
        if !present(&self.pool_a_host) || !present(&self.pool_b_host) {
            return Err(anyhow::anyhow!(
                "REPLICATION_POOL_A_HOST and REPLICATION_POOL_B_HOST must be set when replication is enabled"
            ));
        }
        if !present(&self.username) {
            return Err(anyhow::anyhow!(
                "REPLICATION_USERNAME must be set when replication is enabled"
            ));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(anyhow::anyhow!(
                "REPLICATION_CONNECT_TIMEOUT_SECONDS must be greater than 0"
            ));
        }
        Ok(())
    }
}

/// HTTP adapter settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub max_body_size_bytes: usize,
    /// `json` for JSON log lines, anything else for the human-readable format.
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: SERVER_PORT,
            environment: "development".to_string(),
            max_body_size_bytes: MAX_BODY_SIZE_MB * 1024 * 1024,
            log_format: "text".to_string(),
        }
    }
}

/// Complete intake configuration.
#[derive(Clone, Debug)]
pub struct IntakeConfig {
    pub server: ServerConfig,
    pub uploads_path: PathBuf,
    pub storage: StorageConfig,
    pub replication: ReplicationConfig,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            uploads_path: PathBuf::from(DEFAULT_UPLOADS_PATH),
            storage: StorageConfig::default(),
            replication: ReplicationConfig::default(),
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server = ServerConfig {
            port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            max_body_size_bytes: env_parse("MAX_BODY_SIZE_MB", MAX_BODY_SIZE_MB) * 1024 * 1024,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string())
                .to_lowercase(),
        };

        let config = IntakeConfig {
            server,
            uploads_path: env_opt("UPLOADS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_PATH)),
            storage: StorageConfig::from_env()?,
            replication: ReplicationConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.uploads_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOADS_PATH must not be empty"));
        }
        self.storage.validate()?;
        self.replication.validate()?;
        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.server.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr + ToString + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| parse_bool(&v).unwrap_or(default))
        .unwrap_or(default)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eligible_storage() -> StorageConfig {
        StorageConfig {
            access_key_id: Some("AKIA".to_string()),
            secret_access_key: Some("secret".to_string()),
            bucket_name: Some("uploads".to_string()),
            url_ttl_seconds: Some(3600),
            ..StorageConfig::default()
        }
    }

    #[test]
    fn complete_storage_config_is_eligible() {
        assert!(eligible_storage().is_object_store_eligible());
    }

    #[test]
    fn any_missing_required_field_disables_object_store() {
        let mut config = eligible_storage();
        config.access_key_id = None;
        assert!(!config.is_object_store_eligible());

        let mut config = eligible_storage();
        config.secret_access_key = Some(String::new());
        assert!(!config.is_object_store_eligible());

        let mut config = eligible_storage();
        config.bucket_name = Some("   ".to_string());
        assert!(!config.is_object_store_eligible());

        let mut config = eligible_storage();
        config.url_ttl_seconds = None;
        assert!(!config.is_object_store_eligible());
    }

    #[test]
    fn long_upload_requires_async_flag_and_strictly_larger_size() {
        let mut config = eligible_storage();
        config.size_threshold_bytes = 100;
        assert!(!config.is_long_upload(101));

        config.async_long_uploads_enabled = true;
        assert!(!config.is_long_upload(100));
        assert!(config.is_long_upload(101));

        config.bucket_name = None;
        assert!(!config.is_long_upload(10_000));
    }

    #[test]
    fn default_threshold_is_fifty_mebibytes() {
        assert_eq!(StorageConfig::default().size_threshold_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn zero_ttl_fails_validation() {
        let mut config = eligible_storage();
        config.url_ttl_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn enabled_replication_requires_hosts_and_username() {
        let mut config = ReplicationConfig {
            enabled: true,
            ..ReplicationConfig::default()
        };
        assert!(config.validate().is_err());

        config.pool_a_host = Some("filer-a.internal".to_string());
        config.pool_b_host = Some("filer-b.internal".to_string());
        assert!(config.validate().is_err());

        config.username = Some("mirror".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn disabled_replication_always_validates() {
        assert!(ReplicationConfig::default().validate().is_ok());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn production_detection() {
        let mut config = IntakeConfig::default();
        assert!(!config.is_production());
        config.server.environment = "Prod".to_string();
        assert!(config.is_production());
    }
}
