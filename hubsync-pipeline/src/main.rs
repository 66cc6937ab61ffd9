//! HUBSYNC Entry Point
//!
//! Loads configuration from the environment, connects to the CRM and the
//! warehouse, runs one sync and exits non-zero on a fatal error.

use std::process::ExitCode;

use hubsync_core::{SyncConfig, SyncResult};
use hubsync_crm::HubSpotClient;
use hubsync_pipeline::{init_tracing, run_sync, SyncReport, TelemetryConfig};
use hubsync_warehouse::PgWarehouse;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = TelemetryConfig::from_env().and_then(|config| init_tracing(&config)) {
        eprintln!("hubsync: {}", e);
        return ExitCode::FAILURE;
    }

    match run().await {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync failed");
            eprintln!("hubsync: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SyncResult<SyncReport> {
    let config = SyncConfig::from_env()?;
    let crm = HubSpotClient::from_config(&config)?;
    let warehouse = PgWarehouse::connect(&config.warehouse).await?;

    let result = run_sync(&config, &crm, &warehouse).await;
    warehouse.close();
    result
}
