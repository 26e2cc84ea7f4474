// rdsbackup/src/sql/sqlserver.rs
use secrecy::ExposeSecret;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;
use tracing::{debug, error, info};

use super::{ConnectionDescriptor, ResultRow, SqlGateway};
use crate::errors::SqlError;
use crate::utils::truncate_for_log;

const APPLICATION_NAME: &str = "rdsbackup";

/// SQL Server gateway over TDS. Each command opens its own connection and
/// closes it before returning, so nothing is held across the polling sleeps.
pub struct SqlServerGateway;

impl SqlServerGateway {
    fn build_config(connection: &ConnectionDescriptor) -> Config {
        let mut config = Config::new();
        config.host(&connection.endpoint.host);
        config.port(connection.endpoint.port);
        config.database(&connection.database);
        config.application_name(APPLICATION_NAME);
        config.authentication(AuthMethod::sql_server(
            &connection.username,
            connection.password.expose_secret(),
        ));
        config.encryption(EncryptionLevel::Required);
        if connection.trust_server_certificate {
            config.trust_cert();
        }
        config
    }

    async fn run(
        connection: &ConnectionDescriptor,
        command: &str,
    ) -> Result<Option<Vec<ResultRow>>, tiberius::error::Error> {
        let config = Self::build_config(connection);

        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        let mut client = Client::connect(config, tcp.compat_write()).await?;

        let rows = client.simple_query(command).await?.into_first_result().await?;
        client.close().await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let rendered = rows
            .into_iter()
            .map(|row| row.into_iter().map(render_column).collect::<ResultRow>())
            .collect::<Vec<_>>();
        Ok(Some(rendered))
    }
}

#[async_trait::async_trait]
impl SqlGateway for SqlServerGateway {
    async fn execute(
        &self,
        connection: &ConnectionDescriptor,
        command: &str,
    ) -> Result<Option<Vec<ResultRow>>, SqlError> {
        info!(target_db = %connection, "Executing SQL: {}", truncate_for_log(command, 100));

        let outcome = tokio::time::timeout(connection.connect_timeout, Self::run(connection, command))
            .await
            .map_err(|_| SqlError::Database {
                code: "HYT00".to_string(),
                message: format!(
                    "Timeout expired after {}s",
                    connection.connect_timeout.as_secs()
                ),
            })
            .and_then(|result| result.map_err(map_tiberius_error));

        match &outcome {
            Ok(Some(rows)) => debug!(rows = rows.len(), "Command returned rows"),
            Ok(None) => debug!("Command returned no rows"),
            Err(e) => error!(
                error = %e,
                command = %truncate_for_log(command, 200),
                "❌ SQL execution failed"
            ),
        }
        outcome
    }
}

fn map_tiberius_error(err: tiberius::error::Error) -> SqlError {
    use tiberius::error::Error;

    match err {
        Error::Server(token) => SqlError::Database {
            code: token.code().to_string(),
            message: token.message().to_string(),
        },
        Error::Io { message, .. } => SqlError::Database {
            code: "08S01".to_string(),
            message,
        },
        Error::Tls(message) => SqlError::Database {
            code: "08001".to_string(),
            message,
        },
        Error::Routing { host, port } => SqlError::Database {
            code: "08001".to_string(),
            message: format!("Server requested routing to {}:{}", host, port),
        },
        Error::Protocol(message) => SqlError::Database {
            code: "08P01".to_string(),
            message: message.to_string(),
        },
        other => SqlError::Unexpected(other.to_string()),
    }
}

/// Renders a column as text; task ids and status codes are all the caller needs.
fn render_column(data: ColumnData<'static>) -> Option<String> {
    match data {
        ColumnData::String(v) => v.map(|s| s.into_owned()),
        ColumnData::U8(v) => v.map(|n| n.to_string()),
        ColumnData::I16(v) => v.map(|n| n.to_string()),
        ColumnData::I32(v) => v.map(|n| n.to_string()),
        ColumnData::I64(v) => v.map(|n| n.to_string()),
        ColumnData::F32(v) => v.map(|n| n.to_string()),
        ColumnData::F64(v) => v.map(|n| n.to_string()),
        ColumnData::Bit(v) => v.map(|b| b.to_string()),
        ColumnData::Guid(v) => v.map(|g| g.to_string()),
        ColumnData::Numeric(v) => v.map(|n| n.to_string()),
        other => Some(format!("{:?}", other)),
    }
}
