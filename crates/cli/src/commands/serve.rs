use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use slate_core::config::SlateConfig;
use tokio::net::TcpListener;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use super::{build_orchestrator, open_repo, seed_credentials};

/// Run the `serve` command: start the sync API web server.
pub async fn run(config_path: &str, port: u16) -> anyhow::Result<()> {
    let config = SlateConfig::load(Path::new(config_path))?;
    config.validate()?;

    let repo = open_repo(&config).await?;
    seed_credentials(&config, &repo).await?;

    let orchestrator = build_orchestrator(&config, Arc::clone(&repo))?;
    let state = Arc::new(slate_server::AppState {
        repo: Arc::clone(&repo),
        orchestrator,
    });

    let app = slate_server::router(state)
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    println!("Slate sync API listening on http://{addr}");
    info!("Starting server on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
