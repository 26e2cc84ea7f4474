// rdsbackup/src/backup/handler.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use super::logic::BackupOrchestrator;
use crate::config::AppConfig;
use crate::credentials::CredentialProvider;
use crate::errors::AppError;
use crate::sql::SqlGateway;
use crate::utils::clock::Clock;

/// Trigger payload. `NomeBanco` is accepted for events produced by existing
/// schedules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationEvent {
    #[serde(alias = "NomeBanco")]
    pub database_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    pub body: String,
}

impl InvocationResponse {
    pub fn fatal(status_code: u16, message: &str) -> Self {
        Self {
            status_code,
            body: Value::String(message.to_string()).to_string(),
        }
    }

    fn from_error(err: &AppError) -> Self {
        Self::fatal(err.status_code(), &err.to_string())
    }
}

/// Collaborators the handler wires into the orchestrator.
pub struct Collaborators {
    pub credentials: Arc<dyn CredentialProvider>,
    pub gateway: Arc<dyn SqlGateway>,
    pub clock: Arc<dyn Clock>,
}

/// Handles one invocation for one database.
///
/// Configuration and credential problems produce an error status; a backup
/// that ran but failed still answers 200 with `FAILED` in the body.
pub async fn handle_invocation(
    event: InvocationEvent,
    app_config: &AppConfig,
    collaborators: Collaborators,
) -> InvocationResponse {
    info!("Starting backup invocation");

    let Some(database) = event
        .database_name
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
    else {
        error!("Invocation event carries no database name");
        return InvocationResponse::from_error(&AppError::InvalidInput(
            "database_name is required".to_string(),
        ));
    };

    let settings = match app_config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "❌ Critical configuration error");
            return InvocationResponse::from_error(&e);
        }
    };

    info!(
        endpoint = %settings.endpoint.host,
        bucket = %settings.storage.bucket,
        secret_id = %settings.secret_id,
        "Using configuration"
    );

    let orchestrator = BackupOrchestrator::new(
        settings,
        collaborators.credentials,
        collaborators.gateway,
        collaborators.clock,
    );

    match orchestrator.run_backup(&database).await {
        Ok(result) => {
            info!(
                database = %result.database,
                status = %result.status,
                task_id = ?result.task_id,
                attempts = result.attempts,
                "Backup summary"
            );
            InvocationResponse {
                status_code: 200,
                body: result.to_status_map().to_string(),
            }
        }
        Err(e) => {
            error!(error = %e, "❌ Backup aborted");
            InvocationResponse::from_error(&e)
        }
    }
}
