mod config;
mod errors;
mod ledger;
mod models;
mod output;
mod pipeline;
mod records;
mod state;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::state::AppState;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Filter from a `RUST_LOG` value, `info` when unset or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Before the subscriber, so RUST_LOG may come from .env. A missing file is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let result = async {
        let config = AppConfig::from_env()?;
        let state = AppState::from_config(&config).await?;
        let outcome = pipeline::run(&state).await?;
        Ok::<_, AppError>((state, outcome))
    }
    .await;

    match result {
        Ok((state, outcome)) => {
            info!(
                medical_record = %outcome.medical_record.attestation_id,
                prescription = %outcome.prescription.attestation_id,
                output_dir = %state.writer.dir().display(),
                "done"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "attestation run failed");
            Err(e)
        }
    }
}
