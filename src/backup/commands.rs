// rdsbackup/src/backup/commands.rs
use chrono::{DateTime, Utc};

use crate::config::StorageTarget;
use crate::errors::AppError;

const ARTIFACT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";
const MAX_DATABASE_NAME_CHARS: usize = 128;

/// Rejects database names that could not have come from a real catalog.
pub fn validate_database_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("database name is required".to_string()));
    }
    if name.chars().count() > MAX_DATABASE_NAME_CHARS {
        return Err(AppError::InvalidInput(format!(
            "database name longer than {} characters",
            MAX_DATABASE_NAME_CHARS
        )));
    }
    if name.contains(char::is_control) {
        return Err(AppError::InvalidInput(format!(
            "control character in database name {:?}",
            name
        )));
    }
    Ok(())
}

/// `<database>-<YYYY-mm-dd-HHMMSS>.bak`
pub fn artifact_name(database: &str, submitted_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}.bak",
        database,
        submitted_at.format(ARTIFACT_TIMESTAMP_FORMAT)
    )
}

/// Like [`artifact_name`], but appends the attempt number when an earlier
/// attempt of the same run already took the plain name.
pub fn attempt_artifact_name(
    database: &str,
    submitted_at: DateTime<Utc>,
    attempt: u32,
    taken: &[String],
) -> String {
    let name = artifact_name(database, submitted_at);
    if !taken.contains(&name) {
        return name;
    }
    format!(
        "{}-{}-{}.bak",
        database,
        submitted_at.format(ARTIFACT_TIMESTAMP_FORMAT),
        attempt
    )
}

pub fn s3_arn(storage: &StorageTarget, artifact_name: &str) -> String {
    match &storage.prefix {
        Some(prefix) => format!("arn:aws:s3:::{}/{}/{}", storage.bucket, prefix, artifact_name),
        None => format!("arn:aws:s3:::{}/{}", storage.bucket, artifact_name),
    }
}

pub fn backup_command(database: &str, s3_arn: &str) -> String {
    format!(
        "EXEC msdb.dbo.rds_backup_database \
         @source_db_name={}, \
         @s3_arn_to_backup_to={}, \
         @type='FULL';",
        sql_literal(database),
        sql_literal(s3_arn)
    )
}

pub fn status_command(task_id: &str) -> String {
    match task_id.parse::<i64>() {
        Ok(id) => format!("exec msdb.dbo.rds_task_status @task_id={};", id),
        Err(_) => format!("exec msdb.dbo.rds_task_status @task_id={};", sql_literal(task_id)),
    }
}

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_artifact_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap();
        assert_eq!(artifact_name("orders", at), "orders-2024-03-09-070503.bak");
    }

    #[test]
    fn test_attempt_artifact_name_same_second() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        let first = attempt_artifact_name("orders", at, 1, &[]);
        assert_eq!(first, "orders-2024-05-01-030000.bak");

        let mut taken = vec![first];
        let second = attempt_artifact_name("orders", at, 2, &taken);
        assert_eq!(second, "orders-2024-05-01-030000-2.bak");

        taken.push(second);
        let third = attempt_artifact_name("orders", at, 3, &taken);
        assert_eq!(third, "orders-2024-05-01-030000-3.bak");

        let later = at + chrono::Duration::seconds(1);
        assert_eq!(
            attempt_artifact_name("orders", later, 4, &taken),
            "orders-2024-05-01-030001.bak"
        );
    }

    #[test]
    fn test_s3_arn_with_and_without_prefix() {
        let plain = StorageTarget {
            bucket: "backups".to_string(),
            prefix: None,
        };
        assert_eq!(s3_arn(&plain, "a.bak"), "arn:aws:s3:::backups/a.bak");

        let prefixed = StorageTarget {
            bucket: "backups".to_string(),
            prefix: Some("sqlserver/nightly".to_string()),
        };
        assert_eq!(
            s3_arn(&prefixed, "a.bak"),
            "arn:aws:s3:::backups/sqlserver/nightly/a.bak"
        );
    }

    #[test]
    fn test_backup_command_requests_full_backup() {
        let cmd = backup_command("orders", "arn:aws:s3:::b/orders-x.bak");
        assert!(cmd.starts_with("EXEC msdb.dbo.rds_backup_database"));
        assert!(cmd.contains("@source_db_name='orders'"));
        assert!(cmd.contains("@s3_arn_to_backup_to='arn:aws:s3:::b/orders-x.bak'"));
        assert!(cmd.contains("@type='FULL'"));
    }

    #[test]
    fn test_status_command_numeric_and_quoted() {
        assert_eq!(status_command("42"), "exec msdb.dbo.rds_task_status @task_id=42;");
        assert_eq!(
            status_command("a'b"),
            "exec msdb.dbo.rds_task_status @task_id='a''b';"
        );
    }

    #[test]
    fn test_validate_database_name() {
        assert!(validate_database_name("orders_2024-eu").is_ok());
        assert!(validate_database_name("my db").is_ok());
        assert!(validate_database_name("sales.eu").is_ok());
        assert!(validate_database_name("O'Brien").is_ok());
        assert!(validate_database_name("").is_err());
        assert!(validate_database_name("   ").is_err());
        assert!(validate_database_name("orders\n").is_err());
        assert!(validate_database_name("a\u{0}b").is_err());
        assert!(validate_database_name(&"x".repeat(128)).is_ok());
        assert!(validate_database_name(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_backup_command_escapes_quoted_names() {
        let cmd = backup_command("O'Brien", "arn:aws:s3:::b/O'Brien-x.bak");
        assert!(cmd.contains("@source_db_name='O''Brien'"));
        assert!(cmd.contains("@s3_arn_to_backup_to='arn:aws:s3:::b/O''Brien-x.bak'"));
    }
}
