use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toonify_api::background::job_retention;
use toonify_api::config::ServerConfig;
use toonify_api::router::build_app_router;
use toonify_api::state::{comic_generator, AppState};
use toonify_store::{InMemoryJobStore, JobStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "toonify_api=debug,toonify_worker=debug,toonify_comic=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(
        host = %config.host,
        port = %config.port,
        comic_api_url = %config.comic_api_url,
        upstream_timeout_secs = config.upstream_timeout.as_secs(),
        job_retention_secs = config.job_retention.as_secs(),
        retry_attempts = config.retry.max_attempts,
        "Loaded server configuration"
    );

    // --- Job store ---
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    // --- Retention ---
    let retention_cancel = tokio_util::sync::CancellationToken::new();
    let retention_handle = config.sweep_interval.map(|interval| {
        tokio::spawn(job_retention::run(
            Arc::clone(&store),
            config.job_retention,
            interval,
            retention_cancel.clone(),
        ))
    });

    // --- App state ---
    let generator = comic_generator(&config);
    let state = AppState::new(config.clone(), Arc::clone(&store), generator);
    let runner = state.runner.clone();

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);

    retention_cancel.cancel();
    if let Some(handle) = retention_handle {
        let _ = tokio::time::timeout(shutdown_timeout, handle).await;
        tracing::info!("Job retention task stopped");
    }

    tracing::info!(in_flight = runner.in_flight(), "Waiting for in-flight jobs");
    if runner.drain(shutdown_timeout).await {
        tracing::info!("All in-flight jobs finished");
    } else {
        tracing::warn!(
            abandoned = runner.in_flight(),
            timeout_secs = config.shutdown_timeout_secs,
            "Shutdown timeout reached, abandoning in-flight jobs"
        );
    }

    tracing::info!(tracked = store.len().await, "Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
