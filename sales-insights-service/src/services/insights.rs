//! Customer insight lookups: outstanding balance, last selling rate, price
//! history and credit utilization.

use crate::models::{
    CreditInfo, CustomerOutstanding, LastSellingRate, PriceHistoryEntry, AMOUNT_PRECISION,
    CUSTOMER,
};
use crate::services::metrics::{ERRORS_TOTAL, LOOKUPS_TOTAL};
use crate::services::repository::InsightsRepository;
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

pub const DEFAULT_PRICE_HISTORY_LIMIT: i64 = 5;
pub const MAX_PRICE_HISTORY_LIMIT: i64 = 100;
pub const DEFAULT_CURRENCY_CACHE_TTL: Duration = Duration::from_secs(300);

fn record<T>(operation: &str, result: &Result<T, AppError>) {
    match result {
        Ok(_) => LOOKUPS_TOTAL.with_label_values(&[operation, "ok"]).inc(),
        Err(e) => {
            LOOKUPS_TOTAL.with_label_values(&[operation, "error"]).inc();
            ERRORS_TOTAL.with_label_values(&[e.kind()]).inc();
        }
    }
}

pub struct InsightsService {
    repo: Arc<dyn InsightsRepository>,
    /// Company default currencies with the time they were read. Entries older
    /// than `currency_ttl` are reloaded, so a changed default currency shows
    /// up within one TTL.
    currency_cache: DashMap<String, (String, Instant)>,
    currency_ttl: Duration,
    fallback_currency: String,
}

impl InsightsService {
    pub fn new(repo: Arc<dyn InsightsRepository>, fallback_currency: impl Into<String>) -> Self {
        Self {
            repo,
            currency_cache: DashMap::new(),
            currency_ttl: DEFAULT_CURRENCY_CACHE_TTL,
            fallback_currency: fallback_currency.into(),
        }
    }

    pub fn with_currency_ttl(mut self, ttl: Duration) -> Self {
        self.currency_ttl = ttl;
        self
    }

    /// Currency reported alongside a zero balance when the lookup fails.
    pub fn fallback_currency(&self) -> &str {
        &self.fallback_currency
    }

    pub fn repository(&self) -> &Arc<dyn InsightsRepository> {
        &self.repo
    }

    async fn company_currency(&self, company: &str) -> Result<Option<String>, AppError> {
        if let Some(entry) = self.currency_cache.get(company) {
            let (currency, loaded_at) = entry.value();
            if loaded_at.elapsed() < self.currency_ttl {
                return Ok(Some(currency.clone()));
            }
        }

        let currency = self.repo.company_default_currency(company).await?;
        match &currency {
            Some(currency) => {
                self.currency_cache
                    .insert(company.to_string(), (currency.clone(), Instant::now()));
            }
            None => {
                self.currency_cache.remove(company);
            }
        }
        Ok(currency)
    }

    /// Total outstanding on the customer's submitted invoices in `company`.
    #[instrument(skip(self))]
    pub async fn get_customer_outstanding(
        &self,
        customer: &str,
        company: &str,
    ) -> Result<CustomerOutstanding, AppError> {
        let result = async {
            let total = self
                .repo
                .customer_outstanding_total(customer, company)
                .await?;
            let currency = self.company_currency(company).await?;

            Ok::<_, AppError>(CustomerOutstanding {
                outstanding_amount: total.round_dp(AMOUNT_PRECISION),
                currency,
            })
        }
        .await;

        record("get_customer_outstanding", &result);
        result
    }

    /// Rate on the customer's most recent submitted line for `item_code`.
    #[instrument(skip(self))]
    pub async fn get_customer_last_rate(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
    ) -> Result<LastSellingRate, AppError> {
        let result = self
            .repo
            .last_selling_rate(customer, item_code, company)
            .await
            .map(|row| match row {
                Some(row) => LastSellingRate {
                    last_rate: row.last_rate.round_dp(AMOUNT_PRECISION),
                    last_invoice_date: Some(row.posting_date),
                    last_invoice: Some(row.invoice_name),
                },
                None => {
                    debug!("No submitted sales for customer and item");
                    LastSellingRate::default()
                }
            });

        record("get_customer_last_rate", &result);
        result
    }

    /// Up to `limit` (default 5, at most 100) recent submitted lines, newest
    /// first. A limit of zero or less yields no lines.
    #[instrument(skip(self))]
    pub async fn get_item_price_history(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
        limit: Option<i64>,
    ) -> Result<Vec<PriceHistoryEntry>, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_PRICE_HISTORY_LIMIT)
            .clamp(0, MAX_PRICE_HISTORY_LIMIT);

        if limit == 0 {
            record("get_item_price_history", &Ok::<_, AppError>(()));
            return Ok(Vec::new());
        }

        let result = self
            .repo
            .price_history(customer, item_code, company, limit)
            .await;

        record("get_item_price_history", &result);
        result
    }

    /// Credit limit for `company`, the outstanding balance counted against
    /// it, and the utilization percentage.
    #[instrument(skip(self))]
    pub async fn get_customer_credit_info(
        &self,
        customer: &str,
        company: &str,
    ) -> Result<CreditInfo, AppError> {
        let result = async {
            let customer_doc = self.repo.get_customer(customer).await?.ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("{} {} not found", CUSTOMER, customer))
            })?;

            let credit_limit = customer_doc.credit_limit_for(company);
            let used_credit = self
                .get_customer_outstanding(customer, company)
                .await?
                .outstanding_amount;

            Ok::<_, AppError>(CreditInfo::compute(credit_limit, used_credit))
        }
        .await;

        record("get_customer_credit_info", &result);
        result
    }
}
