mod config;
mod error;
mod handlers;
mod metrics;
mod models;
mod notifier;
mod orchestrator;
mod providers;
mod rate_limit;
mod routes;
mod state;
mod storage;
#[cfg(test)]
mod test_support;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;
use crate::notifier::MessageRoute;
use crate::orchestrator::UploadOrchestrator;
use crate::providers::{CloudinaryClient, TwilioClient};
use crate::rate_limit::{RateLimiter, run_sweeper};
use crate::routes::create_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_intake=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments / environment
    let args = Args::parse();

    // one HTTP client for both providers
    let client = reqwest::Client::new();
    let storage = CloudinaryClient::new(
        client.clone(),
        &args.cloudinary_cloud_name,
        &args.cloudinary_api_key,
        &args.cloudinary_api_secret,
    )
    .with_base_url(&args.cloudinary_base_url);
    let notifier = TwilioClient::new(client, &args.twilio_account_sid, &args.twilio_auth_token)
        .with_base_url(&args.twilio_base_url);

    let orchestrator = UploadOrchestrator::new(
        Arc::new(storage),
        Arc::new(notifier),
        MessageRoute::new(&args.notify_from, &args.notify_to),
    )
    .with_call_timeout(args.provider_timeout());

    let rate_limiter = Arc::new(RateLimiter::new(args.rate_limit, args.rate_window()));

    // spawn the background sweeper
    tokio::spawn(run_sweeper(Arc::clone(&rate_limiter), args.sweep_interval()));

    let state = Arc::new(AppState::new(Arc::clone(&rate_limiter), orchestrator));
    let app = create_router(state, args.max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!(address = %addr, "Report intake listening");
    tracing::info!(
        max_requests = rate_limiter.max_requests(),
        window_secs = rate_limiter.window().as_secs(),
        "Rate limit configured"
    );
    tracing::info!(
        cloud = %args.cloudinary_cloud_name,
        notify_to = %args.notify_to,
        timeout_secs = args.provider_timeout,
        "Providers configured"
    );

    // ConnectInfo feeds the per-IP rate limit key
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
