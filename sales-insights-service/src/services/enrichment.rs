//! Background recomputation of the custom fields on a Sales Invoice.

use crate::jobs::{Job, JobHandler};
use crate::models::{CustomField, FieldUpdate, SALES_INVOICE};
use crate::services::insights::InsightsService;
use crate::services::metrics::FIELD_WRITES_TOTAL;
use crate::services::repository::InsightsRepository;
use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What a single run managed to write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// The invoice had no customer; nothing was written.
    pub skipped_no_customer: bool,
    pub outstanding_updated: bool,
    pub items_updated: usize,
    /// Item rows whose last-rate lookup failed.
    pub items_failed: usize,
}

pub struct CustomFieldUpdater {
    repo: Arc<dyn InsightsRepository>,
    insights: Arc<InsightsService>,
}

impl CustomFieldUpdater {
    pub fn new(repo: Arc<dyn InsightsRepository>, insights: Arc<InsightsService>) -> Self {
        Self { repo, insights }
    }

    /// Load the invoice, look up the customer's outstanding balance and each
    /// item's last selling rate, then write them in one transaction.
    ///
    /// All lookups finish before the write transaction is opened, and no
    /// transaction is opened when there is nothing to write. A failed lookup only
    /// skips its own field. Loading, writing and committing failures abort
    /// the run, and every write of that run is discarded.
    #[instrument(skip(self))]
    pub async fn update_custom_fields_background(
        &self,
        doc_name: &str,
    ) -> Result<EnrichmentReport, AppError> {
        let invoice = self.repo.get_sales_invoice(doc_name).await?.ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("{} {} not found", SALES_INVOICE, doc_name))
        })?;

        let mut report = EnrichmentReport::default();

        let Some(customer) = invoice.customer() else {
            debug!(invoice = %doc_name, "Invoice has no customer, nothing to update");
            report.skipped_no_customer = true;
            return Ok(report);
        };

        let mut updates = Vec::with_capacity(invoice.items.len() + 1);

        match self
            .insights
            .get_customer_outstanding(customer, &invoice.company)
            .await
        {
            Ok(outstanding) => {
                updates.push(FieldUpdate {
                    field: CustomField::CustomerOutstanding,
                    name: invoice.name.clone(),
                    value: outstanding.outstanding_amount,
                    update_modified: false,
                });
                report.outstanding_updated = true;
            }
            Err(e) => {
                warn!(
                    invoice = %doc_name,
                    customer = %customer,
                    error = %e,
                    "Outstanding lookup failed, keeping previous value"
                );
            }
        }

        for item in &invoice.items {
            let Some(item_code) = item.item_code() else {
                continue;
            };

            match self
                .insights
                .get_customer_last_rate(customer, item_code, &invoice.company)
                .await
            {
                Ok(last_rate) => {
                    updates.push(FieldUpdate {
                        field: CustomField::CustomerLastRate,
                        name: item.name.clone(),
                        value: last_rate.last_rate,
                        update_modified: false,
                    });
                    report.items_updated += 1;
                }
                Err(e) => {
                    warn!(
                        invoice = %doc_name,
                        item_code = %item_code,
                        error = %e,
                        "Last rate lookup failed, keeping previous value"
                    );
                    report.items_failed += 1;
                }
            }
        }

        if updates.is_empty() {
            debug!(invoice = %doc_name, "No custom field values to write");
            return Ok(report);
        }

        let mut writer = self.repo.begin().await?;
        for update in updates {
            let field = update.field;
            writer.set_value(update).await?;
            FIELD_WRITES_TOTAL
                .with_label_values(&[field.fieldname()])
                .inc();
        }
        writer.commit().await?;

        info!(
            invoice = %doc_name,
            outstanding_updated = report.outstanding_updated,
            items_updated = report.items_updated,
            items_failed = report.items_failed,
            "Custom fields updated"
        );

        Ok(report)
    }
}

#[async_trait]
impl JobHandler for CustomFieldUpdater {
    async fn handle(&self, job: Job) -> Result<(), AppError> {
        match job {
            Job::UpdateCustomFieldsBackground { doc_name } => self
                .update_custom_fields_background(&doc_name)
                .await
                .map(|_| ()),
        }
    }
}
