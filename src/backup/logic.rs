// rdsbackup/src/backup/logic.rs
use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::commands::{
    attempt_artifact_name, backup_command, s3_arn, status_command, validate_database_name,
};
use super::model::{AttemptOutcome, BackupAttempt, BackupResult, BackupStatus};
use super::status::{extract_task_id, PollDecision, StatusRead, TaskStatus};
use crate::config::BackupSettings;
use crate::credentials::CredentialProvider;
use crate::errors::{AppError, SqlError};
use crate::sql::{ConnectionDescriptor, ResultRow, SqlGateway};
use crate::utils::clock::Clock;
use crate::utils::truncate_for_log;

/// Submits a full backup and polls its task until it settles, re-submitting
/// up to `max_attempts` times.
pub struct BackupOrchestrator {
    settings: BackupSettings,
    credentials: Arc<dyn CredentialProvider>,
    gateway: Arc<dyn SqlGateway>,
    clock: Arc<dyn Clock>,
}

impl BackupOrchestrator {
    pub fn new(
        settings: BackupSettings,
        credentials: Arc<dyn CredentialProvider>,
        gateway: Arc<dyn SqlGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            credentials,
            gateway,
            clock,
        }
    }

    /// Runs every backup round for one database.
    ///
    /// Only invalid input and credential failures are returned as errors; a
    /// backup that never succeeds is reported as [`BackupStatus::Failed`].
    #[tracing::instrument(name = "run_backup", skip(self))]
    pub async fn run_backup(&self, database: &str) -> Result<BackupResult, AppError> {
        validate_database_name(database)?;

        let credentials = self
            .credentials
            .get_credentials(&self.settings.secret_id)
            .await?;
        let connection = ConnectionDescriptor::for_admin_database(&self.settings, &credentials);

        let policy = self.settings.retry_policy;
        let mut last_task_id: Option<String> = None;
        let mut succeeded = false;
        let mut attempts_made = 0;
        let mut used_artifacts: Vec<String> = Vec::new();

        for index in 1..=policy.max_attempts {
            attempts_made = index;
            let attempt = self
                .run_attempt(&connection, database, index, &used_artifacts)
                .await;
            used_artifacts.push(attempt.artifact_name.clone());

            if attempt.task_id.is_some() {
                last_task_id = attempt.task_id.clone();
            }

            match &attempt.outcome {
                AttemptOutcome::Success => {
                    succeeded = true;
                    break;
                }
                AttemptOutcome::Failed(reason) => {
                    warn!(attempt = index, task_id = ?attempt.task_id, reason = %reason, "Backup attempt failed");
                }
                AttemptOutcome::TimedOut => {
                    warn!(
                        attempt = index,
                        task_id = ?attempt.task_id,
                        polls = attempt.polls,
                        "Status check limit reached without a terminal status"
                    );
                }
                AttemptOutcome::Pending => {}
            }

            if index < policy.max_attempts {
                info!(
                    attempt = index,
                    wait_secs = policy.retry_backoff.as_secs(),
                    "Waiting before the next backup attempt"
                );
                self.clock.sleep(policy.retry_backoff).await;
            }
        }

        let status = if succeeded {
            info!(task_id = ?last_task_id, "✅ Backup of {} completed successfully", database);
            BackupStatus::Success
        } else {
            error!(
                attempts = attempts_made,
                task_id = ?last_task_id,
                "❌ Backup of {} failed after {} attempt(s)",
                database,
                attempts_made
            );
            BackupStatus::Failed
        };

        Ok(BackupResult {
            database: database.to_string(),
            status,
            task_id: last_task_id,
            attempts: attempts_made,
        })
    }

    /// One round. Anything the body propagates fails this round only.
    async fn run_attempt(
        &self,
        connection: &ConnectionDescriptor,
        database: &str,
        index: u32,
        used_artifacts: &[String],
    ) -> BackupAttempt {
        let submitted_at = self.clock.now();
        let artifact = attempt_artifact_name(database, submitted_at, index, used_artifacts);
        let mut attempt = BackupAttempt::new(database, index, artifact);

        if let Err(e) = self.attempt_body(connection, &mut attempt).await {
            error!(
                attempt = index,
                task_id = ?attempt.task_id,
                error = ?e,
                "Unexpected error during backup attempt"
            );
            attempt.outcome = AttemptOutcome::Failed(format!("unexpected error: {:#}", e));
        }
        attempt
    }

    async fn attempt_body(
        &self,
        connection: &ConnectionDescriptor,
        attempt: &mut BackupAttempt,
    ) -> anyhow::Result<()> {
        let destination = s3_arn(&self.settings.storage, &attempt.artifact_name);
        info!(
            attempt = attempt.index,
            artifact = %attempt.artifact_name,
            destination = %destination,
            "🚀 Submitting full backup"
        );

        let command = backup_command(&attempt.database, &destination);
        let rows = self.execute_admin(connection, &command, attempt).await?;

        let Some(task_id) = extract_task_id(rows.as_deref()) else {
            error!(attempt = attempt.index, "Backup submission returned no task id");
            attempt.outcome = AttemptOutcome::Failed("backup submission returned no task id".to_string());
            return Ok(());
        };

        info!(attempt = attempt.index, task_id = %task_id, "Backup started");
        attempt.task_id = Some(task_id);
        attempt.outcome = self.poll_task(connection, attempt).await?;
        Ok(())
    }

    async fn poll_task(
        &self,
        connection: &ConnectionDescriptor,
        attempt: &mut BackupAttempt,
    ) -> anyhow::Result<AttemptOutcome> {
        let policy = self.settings.retry_policy;
        let task_id = attempt
            .task_id
            .clone()
            .context("polling requires a task id")?;
        let command = status_command(&task_id);

        for poll in 1..=policy.max_status_checks {
            attempt.polls = poll;
            info!(
                attempt = attempt.index,
                task_id = %task_id,
                "Checking task status ({}/{})",
                poll,
                policy.max_status_checks
            );
            self.clock.sleep(policy.poll_interval).await;

            let rows = self.execute_admin(connection, &command, attempt).await?;
            let report = match StatusRead::from_rows(rows.as_deref()) {
                StatusRead::Complete(report) => report,
                StatusRead::Incomplete => {
                    warn!(
                        attempt = attempt.index,
                        task_id = %task_id,
                        poll,
                        "Could not read the full task status, checking again"
                    );
                    continue;
                }
            };

            info!(
                attempt = attempt.index,
                task_id = %task_id,
                poll,
                lifecycle = report.lifecycle.as_deref().unwrap_or("N/A"),
                status = %report.status.as_ref().map(|s| s.to_string()).unwrap_or_default(),
                "Task status"
            );

            let Some(status) = report.status else {
                continue;
            };

            match status.decision() {
                PollDecision::Succeeded => {
                    info!(task_id = %task_id, "Backup task completed");
                    return Ok(AttemptOutcome::Success);
                }
                PollDecision::Failed => {
                    let detail = report.error_detail.unwrap_or_else(|| "N/A".to_string());
                    error!(task_id = %task_id, detail = %detail, "Backup task reported ERROR");
                    return Ok(AttemptOutcome::Failed(format!("task reported ERROR: {}", detail)));
                }
                PollDecision::Cancelled => {
                    warn!(task_id = %task_id, status = %status, "Backup task was cancelled");
                    return Ok(AttemptOutcome::Failed(format!("task {}", status)));
                }
                PollDecision::Continue => {
                    if let TaskStatus::Unknown(raw) = &status {
                        warn!(task_id = %task_id, status = %raw, "Unexpected task status, continuing");
                    }
                }
            }
        }

        Ok(AttemptOutcome::TimedOut)
    }

    /// Database errors become "no rows"; anything else propagates and fails
    /// the round.
    async fn execute_admin(
        &self,
        connection: &ConnectionDescriptor,
        command: &str,
        attempt: &BackupAttempt,
    ) -> anyhow::Result<Option<Vec<ResultRow>>> {
        match self.gateway.execute(connection, command).await {
            Ok(rows) => Ok(rows),
            Err(SqlError::Database { code, message }) => {
                warn!(
                    attempt = attempt.index,
                    task_id = ?attempt.task_id,
                    code = %code,
                    message = %message,
                    command = %truncate_for_log(command, 200),
                    "Database error, treating as no result"
                );
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| {
                format!("Failed to execute '{}'", truncate_for_log(command, 200))
            }),
        }
    }
}
