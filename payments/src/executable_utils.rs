use std::{error::Error, sync::Arc};

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use clap::Parser;
use common::config::{AuthConfig, BackendConfig, Config};
use metrics_exporter_prometheus::PrometheusHandle;
use scoring::{processor::Processor, scorers::RuleBasedScorer, storage::OrderLookup};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use crate::{auth::Authenticator, handlers, storage::PaymentsStorage};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "payments/config/dev.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let mut config = Config::load(&args.config)?;
    config.apply_env_overrides();

    Ok(config)
}

/// `RUST_LOG` wins over the configured level.
pub fn initialize_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn PaymentsStorage>,
    pub processor: Arc<Processor<RuleBasedScorer>>,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new<S>(storage: Arc<S>, auth_config: &AuthConfig) -> Self
    where
        S: PaymentsStorage + OrderLookup + 'static,
    {
        let order_lookup: Arc<dyn OrderLookup> = storage.clone();
        Self {
            storage,
            processor: Arc::new(Processor::new(RuleBasedScorer::default(), order_lookup)),
            auth: Arc::new(Authenticator::from_config(auth_config)),
        }
    }
}

pub fn router(
    state: AppState,
    config: &BackendConfig,
    prometheus: Option<PrometheusHandle>,
) -> Router {
    let mut app = Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/orders", post(handlers::create_order))
        .route("/orders/{order_id}", get(handlers::get_order))
        .route("/payments", post(handlers::create_payment))
        .route("/fraud/score", post(handlers::score_fraud))
        .route("/metrics/summary", get(handlers::metrics_summary))
        .route("/health", get(handlers::health_check));

    // Routes added after the layers below would bypass tracing and CORS.
    if let Some(handle) = prometheus {
        app = app.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

pub async fn run_backend(
    config: &BackendConfig,
    state: AppState,
    prometheus: Option<PrometheusHandle>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = router(state, config, prometheus);

    tracing::info!("Starting backend service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let args = Args::parse_from(["backend"]);
        assert_eq!(args.config, "payments/config/dev.yaml");

        let args = Args::parse_from(["backend", "-c", "payments/config/test.yaml"]);
        assert_eq!(args.config, "payments/config/test.yaml");
    }

    #[test]
    fn test_cors_layer_accepts_mixed_origins() {
        // Invalid entries are skipped rather than failing startup.
        let _ = cors_layer(&["http://localhost:5173".to_string(), "bad\norigin".to_string()]);
        let _ = cors_layer(&["*".to_string()]);
    }
}
