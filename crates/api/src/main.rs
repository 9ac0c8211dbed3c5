use std::sync::Arc;

use anyhow::Context;

use raware_api::app;
use raware_api::shutdown::shutdown_signal;
use raware_infra::{AppConfig, Workers, event_bus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = raware_observability::init() {
        tracing::error!(error = %e, "invalid logging configuration");
        anyhow::bail!("invalid logging configuration: {e}");
    }

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(config = ?config, "starting raware");

    let bus = event_bus::connect(&config.bus).context("failed to connect event bus")?;

    let workers = if config.components.inventory {
        app::inventory_subscriptions(None)
            .start(bus.as_ref())
            .context("failed to start inventory listeners")?
    } else {
        Workers::default()
    };

    if config.components.serves_http() {
        let router = app::build_app(&config, Arc::clone(&bus))?;

        let listener = tokio::net::TcpListener::bind(config.bind_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.bind_addr))?;
        tracing::info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("http server failed")?;
    } else {
        tracing::info!("no http components enabled; running listeners only");
        shutdown_signal().await;
    }

    tokio::task::spawn_blocking(move || workers.shutdown())
        .await
        .context("failed to join listener workers")?;
    tracing::info!("shutdown complete");

    Ok(())
}
