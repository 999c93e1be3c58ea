//! `job-status-listener` -- HTTP bridge from job status reports to the
//! job updates exchange.
//!
//! Job-execution agents POST state transitions here instead of holding
//! broker credentials; each accepted report is published as a canonical
//! update message. Configuration is read from the environment (see
//! [`ServerConfig::from_env`]); `LOG_FORMAT=json` switches logs to JSON lines.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobstatus_api::config::ServerConfig;
use jobstatus_api::router::build_app_router;
use jobstatus_api::state::AppState;
use jobstatus_events::{AmqpConnector, JobUpdatePublisher};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    init_tracing();

    tracing::info!("Starting up the job-status-listener service");

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });
    tracing::info!(
        host = %config.host,
        port = config.port,
        exchange = %config.amqp.exchange,
        routing_key = %config.amqp.routing_key,
        "Loaded server configuration",
    );

    // --- Publisher ---
    let connector = AmqpConnector::new(config.amqp.uri.clone(), config.amqp.exchange.clone());
    let publisher = JobUpdatePublisher::connect(connector, config.publisher_config())
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Unable to connect the job update publisher");
            std::process::exit(1);
        });
    let publisher = Arc::new(publisher);

    // --- Router ---
    let addr = SocketAddr::new(config.host, config.port);
    let config = Arc::new(config);
    let state = AppState::new(Arc::clone(&publisher), Arc::clone(&config));
    let app = build_app_router(state, &config);

    // --- Start server ---
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(%addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        });
    tracing::info!(%addr, "Listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    publisher.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber: `EnvFilter` plus text or JSON output.
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jobstatus_api=info,jobstatus_events=info,tower_http=info".into()
            }),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
