use anyhow::Result;
use nasne_exporter::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let collector = Arc::new(
        collector::Collector::from_config(&app_config.nasne)
            .map_err(|e| anyhow::anyhow!("create nasne client: {}", e))?,
    );
    tracing::info!(
        targets = ?collector.targets().collect::<Vec<_>>(),
        mode = ?app_config.nasne.mode,
        "nasne targets configured"
    );

    let app = routes::app(collector, &app_config.server);
    let listener = tokio::net::TcpListener::bind(&app_config.server.listen_address).await?;
    tracing::info!("Listening on http://{}", app_config.server.listen_address);
    tracing::info!("metrics endpoint: {}", app_config.server.metrics_path);
    tracing::info!("health endpoint: {}", app_config.server.health_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Received shutdown signal");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
}
