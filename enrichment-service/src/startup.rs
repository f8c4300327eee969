//! Application startup and lifecycle management.

use crate::client::{BillingApi, HttpBillingClient};
use crate::config::EnrichmentConfig;
use crate::handlers::{get_account_rows, health_check, metrics_handler};
use crate::pipeline::EnrichmentPipeline;
use crate::services::init_metrics;
use axum::{Router, middleware, routing::get};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<EnrichmentPipeline>,
}

/// Router with every route and layer, independent of any listener.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/accounts/:account_id/rows", get(get_account_rows))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against the real billing API.
    pub async fn build(config: EnrichmentConfig) -> Result<Self, AppError> {
        let client = HttpBillingClient::new(config.billing_api.clone())?;
        Self::build_with_api(config, Arc::new(client)).await
    }

    /// Build the application around any [`BillingApi`] implementation.
    pub async fn build_with_api(
        config: EnrichmentConfig,
        api: Arc<dyn BillingApi>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let pipeline = EnrichmentPipeline::new(api, config.pipeline.clone());
        let state = AppState {
            pipeline: Arc::new(pipeline),
        };

        let addr: SocketAddr = format!("{}:{}", config.common.host, config.common.port)
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "invalid listen address {}:{}: {e}",
                    config.common.host,
                    config.common.port
                ))
            })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Enrichment service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = "enrichment-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router(self.state)).await
    }
}
