//! Application startup and lifecycle management.

use crate::config::SalesInsightsConfig;
use crate::handlers::{router, AppState};
use crate::hooks::Hooks;
use crate::jobs::InProcessQueue;
use crate::services::{
    init_metrics, CustomFieldUpdater, Database, InsightsRepository, InsightsService,
};
use service_core::error::AppError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
    queue: Arc<InProcessQueue>,
    assets_dir: PathBuf,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: SalesInsightsConfig) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        let repo: Arc<dyn InsightsRepository> = Arc::new(db);
        Self::build_with_repository(config, repo).await
    }

    /// Build against an already constructed repository.
    pub async fn build_with_repository(
        config: SalesInsightsConfig,
        repo: Arc<dyn InsightsRepository>,
    ) -> Result<Self, AppError> {
        let insights = Arc::new(
            InsightsService::new(repo.clone(), config.fallback_currency.clone())
                .with_currency_ttl(config.currency_cache_ttl),
        );
        let updater = Arc::new(CustomFieldUpdater::new(repo, insights.clone()));
        let queue = Arc::new(InProcessQueue::start(&config.queue, updater));

        let state = AppState {
            insights,
            queue: queue.clone(),
            hooks: Arc::new(Hooks::default()),
        };

        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %http_addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Sales insights service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state,
            queue,
            assets_dir: config.assets_dir,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let app = router(self.state, self.assets_dir);

        tracing::info!(
            service = "sales-insights-service",
            version = env!("CARGO_PKG_VERSION"),
            http_port = self.http_port,
            "Service ready to accept connections"
        );

        let result = axum::serve(self.http_listener, app).await;
        self.queue.shutdown();

        result.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}
