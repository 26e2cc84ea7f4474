//! RDS SQL Server backup runner
//!
//! Triggers a native full backup of one database to S3 and waits for the
//! engine task to finish, retrying the whole backup on failure.

// rdsbackup/src/main.rs
mod backup;
mod config;
mod credentials;
mod errors;
mod sql;
mod utils;

use anyhow::{Context, Result};
use backup::{Collaborators, InvocationEvent, InvocationResponse};
use config::AppConfig;
use credentials::AwsSecretsManagerProvider;
use sql::SqlServerGateway;
use std::env;
use std::io::Read;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;
use utils::clock::SystemClock;

/// Usage: `rdsbackup <database>`, or pipe an event such as
/// `{"database_name": "orders"}` on stdin.
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    let response = match run_app().await {
        Ok(response) => response,
        Err(e) => {
            error!("❌ Error: {:?}", e);
            InvocationResponse::fatal(500, &format!("{:#}", e))
        }
    };

    match serde_json::to_string(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("❌ Failed to serialize response: {}", e),
    }

    if response.status_code == 200 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_app() -> Result<InvocationResponse> {
    let event = read_invocation_event()?;
    let app_config = AppConfig::load().context("Failed to load application configuration")?;

    let collaborators = Collaborators {
        credentials: Arc::new(AwsSecretsManagerProvider::new(&app_config.aws_region).await),
        gateway: Arc::new(SqlServerGateway),
        clock: Arc::new(SystemClock),
    };

    Ok(backup::handle_invocation(event, &app_config, collaborators).await)
}

/// The database name comes from the first argument; without one the event
/// JSON is read from stdin.
fn read_invocation_event() -> Result<InvocationEvent> {
    if let Some(database) = env::args().nth(1) {
        return Ok(InvocationEvent {
            database_name: Some(database.trim().to_string()),
        });
    }

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read invocation event from stdin")?;
    if input.trim().is_empty() {
        return Ok(InvocationEvent::default());
    }
    serde_json::from_str(&input).context("Failed to parse invocation event JSON")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
