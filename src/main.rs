use std::net::SocketAddr;
use std::time::Duration;

use jaadu::{app, build_state, AppConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging. Reads RUST_LOG environment variable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Missing secrets abort startup here. A local .env file may supply them.
    let config = AppConfig::load()?;
    let state = build_state(&config)?;

    let limiter = state.limiter.clone();
    let sweep_every = config.rate_limit.window.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(sweep_every);
        loop {
            tick.tick().await;
            limiter.purge_expired();
        }
    });

    let app = app(state);
    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        model = %config.gemini.model,
        limit = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        "listening on {}",
        addr
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
