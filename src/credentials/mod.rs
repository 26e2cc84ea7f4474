// rdsbackup/src/credentials/mod.rs
pub(crate) mod aws_secrets;

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::AppError;

pub use aws_secrets::AwsSecretsManagerProvider;

/// Login for the SQL Server instance.
#[derive(Debug, Clone)]
pub struct DbCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Resolves database credentials from a secret store.
///
/// Implementations fail with [`AppError::SecretUnavailable`] when the store
/// cannot be read and [`AppError::SecretMalformed`] when the payload is not a
/// usable username/password record. There is no retry at this layer.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_credentials(&self, secret_id: &str) -> Result<DbCredentials, AppError>;
}

#[derive(Deserialize)]
struct SecretPayload {
    username: Option<String>,
    password: Option<String>,
}

/// Parses the JSON secret string stored for an RDS instance. Fields other than
/// `username` and `password` (`engine`, `host`, `port`, ...) are ignored.
pub fn parse_secret_payload(secret_id: &str, payload: &str) -> Result<DbCredentials, AppError> {
    let malformed = |reason: String| AppError::SecretMalformed {
        secret_id: secret_id.to_string(),
        reason,
    };

    let parsed: SecretPayload = serde_json::from_str(payload)
        .map_err(|e| malformed(format!("payload is not a JSON object: {}", e)))?;

    let username = parsed
        .username
        .filter(|u| !u.is_empty())
        .ok_or_else(|| malformed("missing 'username'".to_string()))?;
    let password = parsed
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| malformed("missing 'password'".to_string()))?;

    Ok(DbCredentials {
        username,
        password: SecretString::from(password),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_parse_secret_payload_ok() -> anyhow::Result<()> {
        let creds = parse_secret_payload(
            "prod/sql",
            r#"{"username":"admin","password":"p@ss;word","engine":"sqlserver","port":1433}"#,
        )?;
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password.expose_secret(), "p@ss;word");
        Ok(())
    }

    #[test]
    fn test_parse_secret_payload_not_json() {
        let err = parse_secret_payload("prod/sql", "admin:secret").unwrap_err();
        assert!(matches!(err, AppError::SecretMalformed { ref secret_id, .. } if secret_id == "prod/sql"));
    }

    #[test]
    fn test_parse_secret_payload_missing_password() {
        let err = parse_secret_payload("prod/sql", r#"{"username":"admin"}"#).unwrap_err();
        assert!(matches!(err, AppError::SecretMalformed { ref reason, .. } if reason.contains("password")));
    }

    #[test]
    fn test_parse_secret_payload_empty_username() {
        let err = parse_secret_payload("prod/sql", r#"{"username":"","password":"x"}"#).unwrap_err();
        assert!(matches!(err, AppError::SecretMalformed { ref reason, .. } if reason.contains("username")));
    }

    #[test]
    fn test_debug_does_not_leak_password() -> anyhow::Result<()> {
        let creds = parse_secret_payload("s", r#"{"username":"admin","password":"hunter2"}"#)?;
        assert!(!format!("{:?}", creds).contains("hunter2"));
        Ok(())
    }
}
