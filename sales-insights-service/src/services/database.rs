//! PostgreSQL access to the host ERP tables.

use crate::models::{
    CustomField, Customer, CustomerCreditLimit, DocStatus, FieldUpdate, PriceHistoryEntry,
    SalesInvoice, SalesInvoiceItem,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::repository::{DocumentWriter, InsightsRepository, LastRateRow};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    name: String,
    customer: Option<String>,
    company: String,
    docstatus: i16,
    posting_date: Option<NaiveDate>,
    outstanding_amount: Option<Decimal>,
    custom_customer_outstanding: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct InvoiceItemRow {
    name: String,
    idx: i64,
    item_code: Option<String>,
    qty: Option<Decimal>,
    rate: Option<Decimal>,
    amount: Option<Decimal>,
    custom_customer_last_rate: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    name: String,
    customer_name: Option<String>,
}

fn db_error(operation: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("Failed to {}: {}", operation, e))
}

/// `UPDATE` for one custom field. Table and column come from [`CustomField`],
/// never from caller input.
fn update_statement(field: CustomField, update_modified: bool) -> String {
    let modified = if update_modified {
        ", modified = LOCALTIMESTAMP"
    } else {
        ""
    };
    format!(
        r#"UPDATE "tab{}" SET {} = $1{} WHERE name = $2"#,
        field.doctype(),
        field.fieldname(),
        modified
    )
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "sales-insights-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    async fn credit_limits(&self, customer: &str) -> Result<Vec<CustomerCreditLimit>, AppError> {
        sqlx::query_as::<_, CustomerCreditLimit>(
            r#"
            SELECT company, credit_limit
            FROM "tabCustomer Credit Limit"
            WHERE parent = $1 AND parenttype = 'Customer'
            ORDER BY idx
            "#,
        )
        .bind(customer)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get credit limits", e))
    }

    #[instrument(skip(self))]
    async fn invoice_items(&self, invoice: &str) -> Result<Vec<SalesInvoiceItem>, AppError> {
        let rows = sqlx::query_as::<_, InvoiceItemRow>(
            r#"
            SELECT name, idx, item_code, qty, rate, amount, custom_customer_last_rate
            FROM "tabSales Invoice Item"
            WHERE parent = $1 AND parenttype = 'Sales Invoice'
            ORDER BY idx
            "#,
        )
        .bind(invoice)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get invoice items", e))?;

        Ok(rows
            .into_iter()
            .map(|row| SalesInvoiceItem {
                name: row.name,
                idx: row.idx,
                item_code: row.item_code,
                qty: row.qty.unwrap_or_default(),
                rate: row.rate.unwrap_or_default(),
                amount: row.amount.unwrap_or_default(),
                custom_customer_last_rate: row.custom_customer_last_rate,
            })
            .collect())
    }
}

#[async_trait]
impl InsightsRepository for Database {
    /// Check database health.
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    #[instrument(skip(self), fields(customer = %customer, company = %company))]
    async fn customer_outstanding_total(
        &self,
        customer: &str,
        company: &str,
    ) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["customer_outstanding_total"])
            .start_timer();

        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(outstanding_amount), 0) AS total_outstanding
            FROM "tabSales Invoice"
            WHERE customer = $1
              AND company = $2
              AND docstatus = 1
              AND outstanding_amount > 0
            "#,
        )
        .bind(customer)
        .bind(company)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("sum customer outstanding", e))?;

        timer.observe_duration();

        Ok(total)
    }

    #[instrument(skip(self))]
    async fn company_default_currency(&self, company: &str) -> Result<Option<String>, AppError> {
        let currency = sqlx::query_scalar::<_, Option<String>>(
            r#"SELECT default_currency FROM "tabCompany" WHERE name = $1"#,
        )
        .bind(company)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get company currency", e))?;

        Ok(currency.flatten())
    }

    #[instrument(skip(self), fields(customer = %customer, item_code = %item_code, company = %company))]
    async fn last_selling_rate(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
    ) -> Result<Option<LastRateRow>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["last_selling_rate"])
            .start_timer();

        let row = sqlx::query_as::<_, LastRateRow>(
            r#"
            SELECT sii.rate AS last_rate, si.posting_date, si.name AS invoice_name
            FROM "tabSales Invoice Item" sii
            JOIN "tabSales Invoice" si ON sii.parent = si.name
            WHERE si.customer = $1
              AND sii.item_code = $2
              AND si.company = $3
              AND si.docstatus = 1
            ORDER BY si.posting_date DESC, si.creation DESC
            LIMIT 1
            "#,
        )
        .bind(customer)
        .bind(item_code)
        .bind(company)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get last selling rate", e))?;

        timer.observe_duration();

        Ok(row)
    }

    #[instrument(skip(self), fields(customer = %customer, item_code = %item_code, company = %company))]
    async fn price_history(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
        limit: i64,
    ) -> Result<Vec<PriceHistoryEntry>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["price_history"])
            .start_timer();

        let entries = sqlx::query_as::<_, PriceHistoryEntry>(
            r#"
            SELECT sii.rate, sii.qty, sii.amount, si.posting_date, si.name AS invoice_name
            FROM "tabSales Invoice Item" sii
            JOIN "tabSales Invoice" si ON sii.parent = si.name
            WHERE si.customer = $1
              AND sii.item_code = $2
              AND si.company = $3
              AND si.docstatus = 1
            ORDER BY si.posting_date DESC, si.creation DESC
            LIMIT $4
            "#,
        )
        .bind(customer)
        .bind(item_code)
        .bind(company)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("get price history", e))?;

        timer.observe_duration();

        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn get_customer(&self, customer: &str) -> Result<Option<Customer>, AppError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"SELECT name, customer_name FROM "tabCustomer" WHERE name = $1"#,
        )
        .bind(customer)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get customer", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let credit_limits = self.credit_limits(&row.name).await?;

        Ok(Some(Customer {
            name: row.name,
            customer_name: row.customer_name,
            credit_limits,
        }))
    }

    #[instrument(skip(self))]
    async fn get_sales_invoice(&self, name: &str) -> Result<Option<SalesInvoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_sales_invoice"])
            .start_timer();

        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT name, customer, company, docstatus, posting_date,
                   outstanding_amount, custom_customer_outstanding
            FROM "tabSales Invoice"
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get sales invoice", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let docstatus = DocStatus::from_i16(row.docstatus).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Sales Invoice {} has invalid docstatus {}",
                row.name,
                row.docstatus
            ))
        })?;

        let items = self.invoice_items(&row.name).await?;

        timer.observe_duration();

        Ok(Some(SalesInvoice {
            name: row.name,
            customer: row.customer,
            company: row.company,
            docstatus,
            posting_date: row.posting_date,
            outstanding_amount: row.outstanding_amount.unwrap_or_default(),
            custom_customer_outstanding: row.custom_customer_outstanding,
            items,
        }))
    }

    async fn begin(&self) -> Result<Box<dyn DocumentWriter>, AppError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;
        Ok(Box::new(PgDocumentWriter { tx }))
    }
}

/// Field writes inside one PostgreSQL transaction.
pub struct PgDocumentWriter {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl DocumentWriter for PgDocumentWriter {
    #[instrument(skip(self), fields(field = update.field.fieldname(), name = %update.name))]
    async fn set_value(&mut self, update: FieldUpdate) -> Result<(), AppError> {
        let sql = update_statement(update.field, update.update_modified);

        let result = sqlx::query(&sql)
            .bind(update.value)
            .bind(&update.name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("set custom field", e))?;

        if result.rows_affected() == 0 {
            warn!(
                doctype = update.field.doctype(),
                name = %update.name,
                "No record updated"
            );
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("commit transaction", e))
    }
}
