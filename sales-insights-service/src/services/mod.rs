//! Services module for sales-insights-service.

pub mod database;
pub mod enrichment;
pub mod insights;
pub mod metrics;
pub mod repository;

pub use database::Database;
pub use enrichment::{CustomFieldUpdater, EnrichmentReport};
pub use insights::InsightsService;
pub use metrics::{get_metrics, init_metrics};
pub use repository::{DocumentWriter, InsightsRepository, LastRateRow};
