// rdsbackup/src/credentials/aws_secrets.rs
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::Client;
use tracing::{error, info};

use super::{parse_secret_payload, CredentialProvider, DbCredentials};
use crate::errors::AppError;

/// Reads RDS credentials from AWS Secrets Manager.
pub struct AwsSecretsManagerProvider {
    client: Client,
}

impl AwsSecretsManagerProvider {
    pub async fn new(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait::async_trait]
impl CredentialProvider for AwsSecretsManagerProvider {
    async fn get_credentials(&self, secret_id: &str) -> Result<DbCredentials, AppError> {
        info!(secret_id, "🔐 Fetching database credentials from Secrets Manager");

        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                let message = aws_sdk_secretsmanager::error::DisplayErrorContext(&e).to_string();
                error!(secret_id, error = %message, "Failed to fetch secret");
                AppError::SecretUnavailable {
                    secret_id: secret_id.to_string(),
                    message,
                }
            })?;

        let secret_string = response.secret_string().ok_or_else(|| AppError::SecretMalformed {
            secret_id: secret_id.to_string(),
            reason: "secret has no SecretString (binary secrets are not supported)".to_string(),
        })?;

        parse_secret_payload(secret_id, secret_string).inspect_err(|e| {
            error!(secret_id, error = %e, "Failed to decode secret payload");
        })
    }
}
