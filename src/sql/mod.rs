// rdsbackup/src/sql/mod.rs
pub(crate) mod sqlserver;

use secrecy::SecretString;
use std::fmt;
use std::time::Duration;

use crate::config::{BackupSettings, Endpoint};
use crate::credentials::DbCredentials;
use crate::errors::SqlError;

pub use sqlserver::SqlServerGateway;

/// Everything needed to open one connection to the SQL Server instance.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub endpoint: Endpoint,
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub trust_server_certificate: bool,
    pub connect_timeout: Duration,
}

impl ConnectionDescriptor {
    /// Descriptor targeting the administrative database, where the backup and
    /// task-status procedures live.
    pub fn for_admin_database(settings: &BackupSettings, credentials: &DbCredentials) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            database: settings.admin_database.clone(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            trust_server_certificate: settings.trust_server_certificate,
            connect_timeout: settings.connect_timeout,
        }
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{},{}/{}",
            self.username, self.endpoint.host, self.endpoint.port, self.database
        )
    }
}

/// One result row, every column rendered as text. `None` is SQL NULL.
pub type ResultRow = Vec<Option<String>>;

/// Executes one command per fresh connection.
///
/// Administrative commands return zero or one result set; `Ok(None)` means the
/// command produced no rows at all.
#[async_trait::async_trait]
pub trait SqlGateway: Send + Sync {
    async fn execute(
        &self,
        connection: &ConnectionDescriptor,
        command: &str,
    ) -> Result<Option<Vec<ResultRow>>, SqlError>;
}
