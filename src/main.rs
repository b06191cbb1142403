use event_assistant::{
    api::{build_router, AppState},
    config::Config,
    search::{EventSearchStore, InitOutcome},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    init_tracing(&config);

    tracing::info!("Starting Event Assistant v{}", env!("CARGO_PKG_VERSION"));

    // Initialize document store
    let store = EventSearchStore::from_config(&config.store).await?;

    match store.initialize().await {
        InitOutcome::Created => tracing::info!("✅ Search indexes created"),
        InitOutcome::AlreadyExists => tracing::info!("✅ Search indexes present"),
        InitOutcome::Failed(e) => {
            tracing::error!(error = %e, "Search index provisioning failed, aborting startup");
            return Err(e.into());
        }
    }

    let app_state = AppState::new(Arc::new(store));
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Event search: http://{}/v1/events/topic?q=", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(http_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "event_assistant={},tower_http={}",
            config.observability.log_level, config.observability.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
