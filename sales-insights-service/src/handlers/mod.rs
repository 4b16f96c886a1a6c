//! HTTP surface: host-style remote methods, document event ingress, static
//! assets, health and metrics.

pub mod events;
pub mod methods;

use crate::hooks::{Hooks, APP_NAME};
use crate::jobs::JobQueue;
use crate::services::{get_metrics, InsightsService};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use service_core::middleware::{metrics_middleware, request_id_middleware};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub insights: Arc<InsightsService>,
    pub queue: Arc<dyn JobQueue>,
    pub hooks: Arc<Hooks>,
}

/// Health check endpoint for Docker/K8s liveness checks.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.insights.repository().health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "sales-insights-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "sales-insights-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = get_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Build the HTTP router. Static assets are served from `assets_dir`.
pub fn router(state: AppState, assets_dir: impl Into<PathBuf>) -> Router {
    let method_prefix = format!("/api/method/{}.sales_invoice", APP_NAME);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route(
            &format!("{}.get_customer_outstanding", method_prefix),
            get(methods::get_customer_outstanding),
        )
        .route(
            &format!("{}.get_customer_last_rate", method_prefix),
            get(methods::get_customer_last_rate),
        )
        .route(
            &format!("{}.get_item_price_history", method_prefix),
            get(methods::get_item_price_history),
        )
        .route(
            &format!("{}.get_customer_credit_info", method_prefix),
            get(methods::get_customer_credit_info),
        )
        .route("/api/hooks", get(events::list_hooks))
        .route("/api/hooks/:doctype/:event", post(events::document_event))
        .nest_service(
            &format!("/assets/{}", APP_NAME),
            ServeDir::new(assets_dir.into()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
