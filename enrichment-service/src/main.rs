//! Enrichment Service entry point.

use enrichment_service::config::EnrichmentConfig;
use enrichment_service::services::init_metrics;
use enrichment_service::startup::Application;

use service_core::observability::init_tracing;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing BILLING_API_URL / BILLING_API_TOKEN stops us here, before any request.
    let config = EnrichmentConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("configuration error: {e}")
    })?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        otlp_endpoint = ?config.otlp_endpoint,
        "Starting enrichment-service"
    );

    init_metrics();

    // Token deliberately omitted.
    tracing::info!(
        service_name = %config.service_name,
        http_port = %config.common.port,
        billing_api_url = %config.billing_api.base_url,
        auth = ?config.billing_api.auth,
        timeout_secs = config.billing_api.timeout.as_secs(),
        max_retries = config.billing_api.max_retries,
        subscriber_concurrency = config.pipeline.subscriber_concurrency,
        usage_concurrency = config.pipeline.usage_concurrency,
        "Configuration loaded"
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application");
        anyhow::anyhow!("application build error: {e}")
    })?;

    tokio::select! {
        result = app.run_until_stopped() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Application error");
                return Err(e.into());
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("Graceful shutdown initiated");
        }
    }

    tracing::info!("Service shutdown complete");
    Ok(())
}
