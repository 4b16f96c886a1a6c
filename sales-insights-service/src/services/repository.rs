//! Persistence seams over the host ERP database.

use crate::models::{Customer, FieldUpdate, PriceHistoryEntry, SalesInvoice};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;

/// Most recent submitted line for a customer/item/company.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LastRateRow {
    pub last_rate: Decimal,
    pub posting_date: NaiveDate,
    pub invoice_name: String,
}

/// Read access to invoices, customers and companies.
///
/// Every aggregate only considers submitted invoices (`docstatus = 1`).
#[async_trait]
pub trait InsightsRepository: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    /// Sum of positive outstanding amounts, zero when nothing matches.
    async fn customer_outstanding_total(
        &self,
        customer: &str,
        company: &str,
    ) -> Result<Decimal, AppError>;

    async fn company_default_currency(&self, company: &str) -> Result<Option<String>, AppError>;

    /// Ordered by posting date then creation, newest first.
    async fn last_selling_rate(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
    ) -> Result<Option<LastRateRow>, AppError>;

    /// Same ordering as [`InsightsRepository::last_selling_rate`].
    async fn price_history(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
        limit: i64,
    ) -> Result<Vec<PriceHistoryEntry>, AppError>;

    async fn get_customer(&self, customer: &str) -> Result<Option<Customer>, AppError>;

    async fn get_sales_invoice(&self, name: &str) -> Result<Option<SalesInvoice>, AppError>;

    /// Open a unit of work for direct field writes.
    async fn begin(&self) -> Result<Box<dyn DocumentWriter>, AppError>;
}

/// Direct field-level writes that bypass document validation, made durable
/// by [`DocumentWriter::commit`]. Dropping without commit discards them.
#[async_trait]
pub trait DocumentWriter: Send {
    async fn set_value(&mut self, update: FieldUpdate) -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
