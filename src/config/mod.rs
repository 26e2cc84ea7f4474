// rdsbackup/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::AppError;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_REGION: &str = "sa-east-1";
pub const DEFAULT_ADMIN_DATABASE: &str = "master";
pub const DEFAULT_SQLSERVER_PORT: u16 = 1433;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_MAX_STATUS_CHECKS: u32 = 60;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 30;

// Struct for deserializing config.json. Every field is optional, env vars win.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub rds_endpoint: Option<String>,
    pub s3_backup_bucket: Option<String>,
    pub s3_backup_prefix: Option<String>,
    pub rds_secret_name: Option<String>,
    pub aws_region: Option<String>,
    pub admin_database: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub trust_server_certificate: Option<bool>,
    pub max_attempts: Option<u32>,
    pub max_status_checks: Option<u32>,
    pub poll_interval_secs: Option<u64>,
    pub retry_backoff_secs: Option<u64>,
}

/// Merged but not yet validated configuration.
///
/// Required values stay optional here so that a missing endpoint or bucket can
/// be reported as a fatal invocation response instead of a startup crash.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rds_endpoint: Option<String>,
    pub s3_backup_bucket: Option<String>,
    pub s3_backup_prefix: Option<String>,
    pub rds_secret_name: Option<String>,
    pub aws_region: String,
    pub admin_database: String,
    pub connect_timeout_secs: u64,
    pub trust_server_certificate: bool,
    pub max_attempts: u32,
    pub max_status_checks: u32,
    pub poll_interval_secs: u64,
    pub retry_backoff_secs: u64,
}

/// SQL Server host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// Where backup artifacts land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub bucket: String,
    pub prefix: Option<String>,
}

/// Bounds of the submit-and-poll state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub max_status_checks: u32,
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_status_checks: DEFAULT_MAX_STATUS_CHECKS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
        }
    }
}

/// Validated settings handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    pub endpoint: Endpoint,
    pub storage: StorageTarget,
    pub secret_id: String,
    pub admin_database: String,
    pub connect_timeout: Duration,
    pub trust_server_certificate: bool,
    pub retry_policy: RetryPolicy,
}

impl AppConfig {
    /// Loads `config.json` (or the file named by `RDSBACKUP_CONFIG`) if it
    /// exists, then overlays the process environment.
    pub fn load() -> Result<Self> {
        let explicit_path = std::env::var("RDSBACKUP_CONFIG").ok();
        let raw = match &explicit_path {
            Some(path) => load_raw_json_config(Path::new(path))?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    load_raw_json_config(default_path)?
                } else {
                    RawJsonConfig::default()
                }
            }
        };

        Self::from_sources(raw, |key| std::env::var(key).ok())
            .context("Failed to resolve configuration from config file and environment")
    }

    /// Merges the JSON config with an environment lookup. Environment values
    /// take precedence, empty strings count as unset.
    pub fn from_sources<F>(raw: RawJsonConfig, env: F) -> std::result::Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, fallback: Option<String>| -> Option<String> {
            non_empty(env(key)).or_else(|| non_empty(fallback))
        };

        Ok(AppConfig {
            rds_endpoint: text("RDS_ENDPOINT", raw.rds_endpoint),
            s3_backup_bucket: text("S3_BACKUP_BUCKET", raw.s3_backup_bucket),
            s3_backup_prefix: text("S3_BACKUP_PREFIX", raw.s3_backup_prefix),
            rds_secret_name: text("RDS_SECRET_NAME", raw.rds_secret_name),
            aws_region: text("AWS_REGION", raw.aws_region)
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            admin_database: text("RDS_ADMIN_DATABASE", raw.admin_database)
                .unwrap_or_else(|| DEFAULT_ADMIN_DATABASE.to_string()),
            connect_timeout_secs: parsed(
                &env,
                "RDS_CONNECT_TIMEOUT_SECS",
                raw.connect_timeout_secs,
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
            trust_server_certificate: parsed(
                &env,
                "RDS_TRUST_SERVER_CERTIFICATE",
                raw.trust_server_certificate,
                true,
            )?,
            max_attempts: parsed(&env, "BACKUP_MAX_ATTEMPTS", raw.max_attempts, DEFAULT_MAX_ATTEMPTS)?,
            max_status_checks: parsed(
                &env,
                "BACKUP_MAX_STATUS_CHECKS",
                raw.max_status_checks,
                DEFAULT_MAX_STATUS_CHECKS,
            )?,
            poll_interval_secs: parsed(
                &env,
                "BACKUP_POLL_INTERVAL_SECS",
                raw.poll_interval_secs,
                DEFAULT_POLL_INTERVAL_SECS,
            )?,
            retry_backoff_secs: parsed(
                &env,
                "BACKUP_RETRY_BACKOFF_SECS",
                raw.retry_backoff_secs,
                DEFAULT_RETRY_BACKOFF_SECS,
            )?,
        })
    }

    /// Checks required values and bounds. Runs once per invocation, before
    /// credentials are fetched.
    pub fn validate(&self) -> std::result::Result<BackupSettings, AppError> {
        let endpoint_raw = self
            .rds_endpoint
            .as_deref()
            .ok_or_else(|| AppError::Config("RDS_ENDPOINT not configured".to_string()))?;
        let bucket = self
            .s3_backup_bucket
            .clone()
            .ok_or_else(|| AppError::Config("S3_BACKUP_BUCKET not configured".to_string()))?;
        let secret_id = self
            .rds_secret_name
            .clone()
            .ok_or_else(|| AppError::Config("RDS_SECRET_NAME not configured".to_string()))?;

        if self.max_attempts == 0 {
            return Err(AppError::Config("BACKUP_MAX_ATTEMPTS must be at least 1".to_string()));
        }
        if self.max_status_checks == 0 {
            return Err(AppError::Config(
                "BACKUP_MAX_STATUS_CHECKS must be at least 1".to_string(),
            ));
        }

        Ok(BackupSettings {
            endpoint: parse_endpoint(endpoint_raw)?,
            storage: StorageTarget {
                bucket,
                prefix: self
                    .s3_backup_prefix
                    .as_deref()
                    .map(|p| p.trim_matches('/').to_string())
                    .filter(|p| !p.is_empty()),
            },
            secret_id,
            admin_database: self.admin_database.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            trust_server_certificate: self.trust_server_certificate,
            retry_policy: RetryPolicy {
                max_attempts: self.max_attempts,
                max_status_checks: self.max_status_checks,
                poll_interval: Duration::from_secs(self.poll_interval_secs),
                retry_backoff: Duration::from_secs(self.retry_backoff_secs),
            },
        })
    }
}

pub fn load_raw_json_config(config_path: &Path) -> Result<RawJsonConfig> {
    let config_content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
    serde_json::from_str(&config_content).with_context(|| {
        format!(
            "Failed to parse JSON from config file at {}",
            config_path.display()
        )
    })
}

/// Accepts `host`, `host,port`, `host:port` and the `tcp:` prefix used in
/// SQL Server connection strings.
pub fn parse_endpoint(raw: &str) -> std::result::Result<Endpoint, AppError> {
    let trimmed = raw.trim();
    let without_scheme = trimmed.strip_prefix("tcp:").unwrap_or(trimmed);

    let (host, port) = match without_scheme.rsplit_once([',', ':']) {
        Some((host, port)) => {
            let port = port.trim().parse::<u16>().map_err(|_| {
                AppError::Config(format!("Invalid port in RDS_ENDPOINT: '{}'", raw))
            })?;
            (host.trim(), port)
        }
        None => (without_scheme, DEFAULT_SQLSERVER_PORT),
    };

    if host.is_empty() {
        return Err(AppError::Config(format!("Invalid RDS_ENDPOINT: '{}'", raw)));
    }

    Ok(Endpoint {
        host: host.to_string(),
        port,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T, F>(env: &F, key: &str, fallback: Option<T>, default: T) -> std::result::Result<T, AppError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(env(key)) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("Invalid value for {}: '{}'", key, value))),
        None => Ok(fallback.unwrap_or(default)),
    }
}
