use std::error::Error;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use payments::{
    executable_utils::{AppState, initialize_executable, initialize_tracing, run_backend},
    storage::{PaymentsStorage, ProdStorage},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting backend...");
    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);
    tracing::info!(project = %config.common.project_name, "Loaded config");

    let prometheus = PrometheusBuilder::new().install_recorder()?;

    let storage = Arc::new(ProdStorage::new(&config.common.database_url).await?);
    storage.create_schema().await?;

    let state = AppState::new(storage, &config.auth);
    run_backend(&config.backend, state, Some(prometheus)).await
}
