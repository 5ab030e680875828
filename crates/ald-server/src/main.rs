mod api;
mod middleware;
mod scheduler;

use std::time::Duration;

use ald_geocode::GoogleGeocoder;
use ald_store::BackendClient;
use ald_watch::WatchOptions;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ald_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let backend = BackendClient::new(
        &config.backend_url,
        config.http_timeout_secs,
        &config.user_agent,
    )?;
    let geocoder = GoogleGeocoder::with_base_url(
        config.geocoder_api_key.clone(),
        config.http_timeout_secs,
        &config.user_agent,
        &config.geocoder_base_url,
    )?
    .with_retry_policy(config.geocoder_max_retries, config.geocoder_backoff_base_ms);
    if !geocoder.is_enabled() {
        tracing::warn!("ALD_GEOCODER_API_KEY not set; search distance filtering disabled");
    }

    let watch_options = WatchOptions {
        interval: Duration::from_secs(config.watch_interval_secs),
        capacity: config.notification_capacity,
    };
    let state = AppState::new(
        backend,
        geocoder,
        config.search_page_size,
        watch_options,
        Duration::from_secs(config.idle_ttl_secs),
    );

    let _scheduler = scheduler::build_scheduler(&state, &config).await?;

    let auth = AuthState::from_env(matches!(config.env, ald_core::Environment::Development))?;
    let app = build_app(state.clone(), auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "ald-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown_watches().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
