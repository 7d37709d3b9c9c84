use std::process::ExitCode;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use doc_convert_worker::app;
use doc_convert_worker::config::settings::AppConfig;
use doc_convert_worker::modules::job::dto::JobResponse;
use doc_convert_worker::modules::job::model::ErrorKind;
use doc_convert_worker::workers::converter;

/// Reads the job event from the file named on the command line, or stdin.
async fn read_event() -> Result<Vec<u8>> {
    match std::env::args().nth(1) {
        Some(path) => tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read event file {}", path)),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read event from stdin")?;
            Ok(buf)
        }
    }
}

/// Every outcome, bootstrap failures included, ends up as a response.
async fn run() -> JobResponse {
    let config = match AppConfig::new().context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return JobResponse::failure(ErrorKind::ConfigurationError, format!("{:#}", e));
        }
    };
    info!(
        "Converting to {} with a {}s deadline",
        config.target_format,
        config.job_timeout.as_secs()
    );

    let state = app::create_state(config);
    let payload = match read_event().await {
        Ok(payload) => payload,
        Err(e) => {
            error!("{:#}", e);
            return JobResponse::failure(ErrorKind::InvalidRequest, format!("{:#}", e));
        }
    };

    converter::handle_payload(&state, &payload).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    // stdout carries the response, logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let response = run().await;
    match serde_json::to_string(&response) {
        Ok(body) => println!("{}", body),
        Err(e) => error!("Failed to render response: {}", e),
    }

    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
