// rdsbackup/src/backup/model.rs
use serde_json::{Map, Value};
use std::fmt;

/// Outcome of one submission round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Success,
    Failed(String),
    TimedOut,
}

/// One submit-and-poll round. Never reused: a retry starts a new attempt with
/// a fresh artifact name and task.
#[derive(Debug, Clone)]
pub struct BackupAttempt {
    pub database: String,
    pub index: u32,
    pub artifact_name: String,
    pub task_id: Option<String>,
    pub outcome: AttemptOutcome,
    pub polls: u32,
}

impl BackupAttempt {
    pub fn new(database: &str, index: u32, artifact_name: String) -> Self {
        Self {
            database: database.to_string(),
            index,
            artifact_name,
            task_id: None,
            outcome: AttemptOutcome::Pending,
            polls: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStatus {
    Success,
    Failed,
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupStatus::Success => write!(f, "SUCCESS"),
            BackupStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Final per-database outcome of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupResult {
    pub database: String,
    pub status: BackupStatus,
    pub task_id: Option<String>,
    pub attempts: u32,
}

impl BackupResult {
    /// `{"<database>": "SUCCESS" | "FAILED"}`
    pub fn to_status_map(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.database.clone(), Value::String(self.status.to_string()));
        Value::Object(map)
    }
}
