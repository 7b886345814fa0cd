use chrono::TimeDelta;
use clap::Parser; // for cli
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use endpoint_limiter::config::{Args, LogFormat, StoreKind};
use endpoint_limiter::error::LimiterError;
use endpoint_limiter::postgrest::PostgrestStore;
use endpoint_limiter::rate_limit::{CountingStore, InMemoryStore};
use endpoint_limiter::router;
use endpoint_limiter::state::AppState;
use endpoint_limiter::sweeper::bucket_sweeper;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // parse cli arguments
    let args = Args::parse();
    init_tracing(args.log_format);

    let store: Arc<dyn CountingStore> = match args.store {
        StoreKind::Memory => Arc::new(InMemoryStore::new()),
        StoreKind::Postgrest => {
            let (url, key) = args.postgrest_credentials()?;
            info!(url = %url, "Using hosted datastore for rate limit buckets");
            Arc::new(PostgrestStore::new(url, key)?)
        }
    };

    let retention = TimeDelta::try_minutes(args.sweep_retention)
        .ok_or_else(|| LimiterError::Config(format!("invalid --sweep-retention {}", args.sweep_retention)))?;
    tokio::spawn(bucket_sweeper(
        store.clone(),
        Duration::from_secs(args.sweep_interval),
        retention,
    ));

    let state = Arc::new(AppState::new(
        store,
        args.default_max_requests,
        args.default_window_minutes,
    ));
    let app = router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(addr = %addr, store = ?args.store, "Rate limiter running");
    info!(
        max_requests = args.default_max_requests,
        window_minutes = args.default_window_minutes,
        "Default policy"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
