// rdsbackup/src/backup/status.rs
use std::fmt;

use crate::sql::ResultRow;

// Column layout of `rds_task_status`.
const TASK_ID_COLUMN: usize = 0;
const LIFECYCLE_COLUMN: usize = 3;
const STATUS_COLUMN: usize = 5;
const ERROR_DETAIL_COLUMN: usize = 6;
const MIN_STATUS_COLUMNS: usize = STATUS_COLUMN + 1;

/// Engine-reported task status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Created,
    InProgress,
    Success,
    Error,
    CancelRequested,
    Cancelled,
    Unknown(String),
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "CREATED" => TaskStatus::Created,
            "IN_PROGRESS" => TaskStatus::InProgress,
            "SUCCESS" => TaskStatus::Success,
            "ERROR" => TaskStatus::Error,
            "CANCEL_REQUESTED" => TaskStatus::CancelRequested,
            "CANCELLED" => TaskStatus::Cancelled,
            other => TaskStatus::Unknown(other.to_string()),
        }
    }

    pub fn decision(&self) -> PollDecision {
        match self {
            TaskStatus::Success => PollDecision::Succeeded,
            TaskStatus::Error => PollDecision::Failed,
            TaskStatus::CancelRequested | TaskStatus::Cancelled => PollDecision::Cancelled,
            TaskStatus::Created | TaskStatus::InProgress | TaskStatus::Unknown(_) => {
                PollDecision::Continue
            }
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Error => "ERROR",
            TaskStatus::CancelRequested => "CANCEL_REQUESTED",
            TaskStatus::Cancelled => "CANCELLED",
            TaskStatus::Unknown(raw) => raw.as_str(),
        };
        f.write_str(s)
    }
}

/// What the poll loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Continue,
    Succeeded,
    Failed,
    Cancelled,
}

/// A status row that has at least the status column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub lifecycle: Option<String>,
    pub status: Option<TaskStatus>,
    pub error_detail: Option<String>,
}

/// Result of reading one status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusRead {
    Complete(StatusReport),
    /// No rows, or fewer columns than the status layout needs.
    Incomplete,
}

impl StatusRead {
    pub fn from_rows(rows: Option<&[ResultRow]>) -> Self {
        let Some(row) = rows.and_then(|r| r.first()) else {
            return StatusRead::Incomplete;
        };
        if row.len() < MIN_STATUS_COLUMNS {
            return StatusRead::Incomplete;
        }

        let text = |idx: usize| -> Option<String> {
            row.get(idx)
                .cloned()
                .flatten()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        StatusRead::Complete(StatusReport {
            lifecycle: text(LIFECYCLE_COLUMN),
            status: text(STATUS_COLUMN).map(|s| TaskStatus::parse(&s)),
            error_detail: text(ERROR_DETAIL_COLUMN),
        })
    }
}

/// First column of the first row returned by `rds_backup_database`.
pub fn extract_task_id(rows: Option<&[ResultRow]>) -> Option<String> {
    rows.and_then(|r| r.first())
        .and_then(|row| row.get(TASK_ID_COLUMN))
        .cloned()
        .flatten()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(values: &[&str]) -> ResultRow {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_task_status_parse_closed_set() {
        assert_eq!(TaskStatus::parse("CREATED"), TaskStatus::Created);
        assert_eq!(TaskStatus::parse(" IN_PROGRESS "), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse("SUCCESS"), TaskStatus::Success);
        assert_eq!(TaskStatus::parse("ERROR"), TaskStatus::Error);
        assert_eq!(TaskStatus::parse("CANCEL_REQUESTED"), TaskStatus::CancelRequested);
        assert_eq!(TaskStatus::parse("CANCELLED"), TaskStatus::Cancelled);
        assert_eq!(
            TaskStatus::parse("PAUSED"),
            TaskStatus::Unknown("PAUSED".to_string())
        );
    }

    #[test]
    fn test_decisions() {
        assert_eq!(TaskStatus::Success.decision(), PollDecision::Succeeded);
        assert_eq!(TaskStatus::Error.decision(), PollDecision::Failed);
        assert_eq!(TaskStatus::Cancelled.decision(), PollDecision::Cancelled);
        assert_eq!(TaskStatus::CancelRequested.decision(), PollDecision::Cancelled);
        assert_eq!(TaskStatus::Created.decision(), PollDecision::Continue);
        assert_eq!(TaskStatus::InProgress.decision(), PollDecision::Continue);
        assert_eq!(
            TaskStatus::Unknown("weird".to_string()).decision(),
            PollDecision::Continue
        );
    }

    #[test]
    fn test_status_read_complete_row() {
        let rows = vec![row(&["42", "BACKUP_DB", "orders", "IN_PROGRESS", "3", "IN_PROGRESS"])];
        assert_eq!(
            StatusRead::from_rows(Some(rows.as_slice())),
            StatusRead::Complete(StatusReport {
                lifecycle: Some("IN_PROGRESS".to_string()),
                status: Some(TaskStatus::InProgress),
                error_detail: None,
            })
        );
    }

    #[test]
    fn test_status_read_with_error_detail() {
        let rows = vec![row(&[
            "42",
            "BACKUP_DB",
            "orders",
            "ERROR",
            "1",
            "ERROR",
            "Access denied to bucket",
        ])];
        let StatusRead::Complete(report) = StatusRead::from_rows(Some(rows.as_slice())) else {
            panic!("expected complete read");
        };
        assert_eq!(report.status, Some(TaskStatus::Error));
        assert_eq!(report.error_detail.as_deref(), Some("Access denied to bucket"));
    }

    #[test]
    fn test_status_read_incomplete() {
        assert_eq!(StatusRead::from_rows(None), StatusRead::Incomplete);
        assert_eq!(StatusRead::from_rows(Some(&[][..])), StatusRead::Incomplete);
        let short = vec![row(&["42", "BACKUP_DB", "orders", "CREATED", "0"])];
        assert_eq!(StatusRead::from_rows(Some(short.as_slice())), StatusRead::Incomplete);
    }

    #[test]
    fn test_status_read_null_status_column() {
        let mut r = row(&["42", "BACKUP_DB", "orders", "CREATED", "0", "x"]);
        r[5] = None;
        let rows = vec![r];
        let StatusRead::Complete(report) = StatusRead::from_rows(Some(rows.as_slice())) else {
            panic!("expected complete read");
        };
        assert_eq!(report.status, None);
    }

    #[test]
    fn test_extract_task_id() {
        assert_eq!(extract_task_id(None), None);
        assert_eq!(extract_task_id(Some(&[][..])), None);
        assert_eq!(extract_task_id(Some(&[vec![None]][..])), None);
        assert_eq!(extract_task_id(Some(&[row(&["  "])][..])), None);
        assert_eq!(
            extract_task_id(Some(&[row(&["42", "BACKUP_DB"])][..])),
            Some("42".to_string())
        );
    }
}
