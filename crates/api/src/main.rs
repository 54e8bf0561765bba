use std::sync::Arc;

use anyhow::Context;

use meteocast_api::{Config, app};
use meteocast_infra::RetrainRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env file.
    dotenvy::dotenv().ok();
    meteocast_observability::init();

    let config = Config::from_env()?;
    tracing::info!(
        dataset = %config.dataset_path.display(),
        fitter = ?config.fitter,
        warm_on_startup = config.warm_on_startup,
        "configuration loaded"
    );

    let services = app::services::build_services(&config).await?;
    let cache = Arc::clone(services.cache());

    if config.warm_on_startup {
        // Detached; readiness is observable through /health.
        let _ = cache.spawn_warmup();
    }

    let retrain = match config.retrain_interval {
        Some(interval) => Some(
            RetrainRunner::with_interval(interval)
                .spawn("meteocast-retrain", Arc::clone(&cache))
                .context("failed to spawn retrain runner")?,
        ),
        None => None,
    };

    let app = app::build_app(services);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(handle) = retrain {
        handle.shutdown();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
