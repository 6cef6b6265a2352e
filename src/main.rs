use anyhow::Context;
use instrument_classifier::config::{BackendKind, Config};
use instrument_classifier::{api, HttpBackend, MockBackend, Registry, Services, SessionContext};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let registry = Registry::builtin();
    let broken = registry.consistency_errors();
    if !broken.is_empty() {
        tracing::warn!(?broken, "Asset type configurations reference undeclared fields");
    }

    let services = match &config.backend {
        BackendKind::Http { url } => {
            tracing::info!(url = %url, "Using back office API");
            Services::from_backend(Arc::new(HttpBackend::new(
                url.clone(),
                config.http_max_elapsed(),
            )))
        }
        BackendKind::Mock => {
            tracing::info!("Using in-memory backend");
            Services::from_backend(Arc::new(MockBackend::new()))
        }
    };

    let ctx = SessionContext::new(
        Arc::new(registry.clone()),
        services,
        config.catalog_ttl(),
        config.lookup_settings(),
    );
    let app = api::create_router(api::AppState::new(ctx));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
