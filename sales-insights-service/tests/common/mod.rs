//! Common test utilities for sales-insights-service integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sales_insights_service::jobs::{EnqueueRequest, JobQueue};
use sales_insights_service::models::{
    CustomField, Customer, CustomerCreditLimit, DocStatus, FieldUpdate, PriceHistoryEntry,
    SalesInvoice, SalesInvoiceItem,
};
use sales_insights_service::services::{DocumentWriter, InsightsRepository, LastRateRow};
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const COMPANY: &str = "Safa Qatar";
pub const OTHER_COMPANY: &str = "Safa Doha";
pub const CUSTOMER_NAME: &str = "Al Noor Trading";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Seed data for one invoice row in the fake host database.
#[derive(Debug, Clone)]
pub struct InvoiceFixture {
    pub name: String,
    pub customer: Option<String>,
    pub company: String,
    pub docstatus: DocStatus,
    pub posting_date: NaiveDate,
    pub outstanding_amount: Decimal,
    pub items: Vec<SalesInvoiceItem>,
}

impl InvoiceFixture {
    pub fn submitted(name: &str, customer: &str, posting_date: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            customer: Some(customer.to_string()),
            company: COMPANY.to_string(),
            docstatus: DocStatus::Submitted,
            posting_date,
            outstanding_amount: Decimal::ZERO,
            items: Vec::new(),
        }
    }

    pub fn draft(name: &str, customer: &str, posting_date: NaiveDate) -> Self {
        Self {
            docstatus: DocStatus::Draft,
            ..Self::submitted(name, customer, posting_date)
        }
    }

    pub fn company(mut self, company: &str) -> Self {
        self.company = company.to_string();
        self
    }

    pub fn without_customer(mut self) -> Self {
        self.customer = None;
        self
    }

    pub fn outstanding(mut self, amount: &str) -> Self {
        self.outstanding_amount = dec(amount);
        self
    }

    pub fn item(mut self, row_name: &str, item_code: &str, qty: &str, rate: &str) -> Self {
        let qty = dec(qty);
        let rate = dec(rate);
        self.items.push(SalesInvoiceItem {
            name: row_name.to_string(),
            idx: self.items.len() as i64 + 1,
            item_code: Some(item_code.to_string()),
            qty,
            rate,
            amount: qty * rate,
            custom_customer_last_rate: None,
        });
        self
    }

    pub fn blank_item(mut self, row_name: &str) -> Self {
        self.items.push(SalesInvoiceItem {
            name: row_name.to_string(),
            idx: self.items.len() as i64 + 1,
            item_code: None,
            qty: Decimal::ONE,
            rate: Decimal::ZERO,
            amount: Decimal::ZERO,
            custom_customer_last_rate: None,
        });
        self
    }
}

#[derive(Default)]
struct Store {
    invoices: Vec<(InvoiceFixture, NaiveDateTime, Option<Decimal>)>,
    customers: HashMap<String, Customer>,
    currencies: HashMap<String, String>,
    committed: Vec<FieldUpdate>,
    commits: usize,
    begins: usize,
    /// Repository and writer calls, in order.
    calls: Vec<&'static str>,
}

#[derive(Default)]
struct Failures {
    outstanding: bool,
    last_rate_items: HashSet<String>,
    price_history: bool,
    get_customer: bool,
    commit: bool,
    write_names: HashSet<String>,
}

/// In-memory stand-in for the host database with the same filtering and
/// ordering rules as the SQL queries.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<Mutex<Store>>,
    failures: Arc<Mutex<Failures>>,
    currency_lookups: Arc<AtomicUsize>,
}

fn injected(what: &str) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("injected failure: {}", what))
}

impl InMemoryRepository {
    pub fn new() -> Self {
        let repo = Self::default();
        repo.set_company_currency(COMPANY, "QAR");
        repo
    }

    pub fn add_invoice(&self, fixture: InvoiceFixture) -> &Self {
        let mut store = self.store.lock().unwrap();
        // Creation follows insertion order, one second apart.
        let base = date(2020, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let creation = base + chrono::Duration::seconds(store.invoices.len() as i64);
        store.invoices.push((fixture, creation, None));
        self
    }

    pub fn add_customer(&self, name: &str, limits: &[(&str, &str)]) -> &Self {
        let customer = Customer {
            name: name.to_string(),
            customer_name: Some(name.to_string()),
            credit_limits: limits
                .iter()
                .map(|(company, limit)| CustomerCreditLimit {
                    company: company.to_string(),
                    credit_limit: dec(limit),
                })
                .collect(),
        };
        self.store
            .lock()
            .unwrap()
            .customers
            .insert(name.to_string(), customer);
        self
    }

    pub fn set_company_currency(&self, company: &str, currency: &str) {
        self.store
            .lock()
            .unwrap()
            .currencies
            .insert(company.to_string(), currency.to_string());
    }

    pub fn fail_outstanding(&self) {
        self.failures.lock().unwrap().outstanding = true;
    }

    pub fn fail_last_rate_for(&self, item_code: &str) {
        self.failures
            .lock()
            .unwrap()
            .last_rate_items
            .insert(item_code.to_string());
    }

    pub fn fail_price_history(&self) {
        self.failures.lock().unwrap().price_history = true;
    }

    pub fn fail_get_customer(&self) {
        self.failures.lock().unwrap().get_customer = true;
    }

    pub fn fail_commit(&self) {
        self.failures.lock().unwrap().commit = true;
    }

    /// Make `set_value` fail for the record `name`.
    pub fn fail_write_for(&self, name: &str) {
        self.failures
            .lock()
            .unwrap()
            .write_names
            .insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.store.lock().unwrap().calls.clone()
    }

    fn log_call(&self, call: &'static str) {
        self.store.lock().unwrap().calls.push(call);
    }

    /// Field writes that were committed, in write order.
    pub fn committed_writes(&self) -> Vec<FieldUpdate> {
        self.store.lock().unwrap().committed.clone()
    }

    pub fn commits(&self) -> usize {
        self.store.lock().unwrap().commits
    }

    pub fn begins(&self) -> usize {
        self.store.lock().unwrap().begins
    }

    pub fn currency_lookups(&self) -> usize {
        self.currency_lookups.load(Ordering::SeqCst)
    }

    /// Committed value of a custom field, if any.
    pub fn custom_value(&self, field: CustomField, name: &str) -> Option<Decimal> {
        self.store
            .lock()
            .unwrap()
            .committed
            .iter()
            .rev()
            .find(|w| w.field == field && w.name == name)
            .map(|w| w.value)
    }

    /// Matching submitted lines, newest first (posting date, then creation).
    fn submitted_lines(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
    ) -> Vec<(NaiveDate, String, SalesInvoiceItem)> {
        let store = self.store.lock().unwrap();
        let mut lines: Vec<(NaiveDate, NaiveDateTime, String, SalesInvoiceItem)> = store
            .invoices
            .iter()
            .filter(|(inv, _, _)| {
                inv.docstatus == DocStatus::Submitted
                    && inv.customer.as_deref() == Some(customer)
                    && inv.company == company
            })
            .flat_map(|(inv, creation, _)| {
                inv.items
                    .iter()
                    .filter(|item| item.item_code.as_deref() == Some(item_code))
                    .map(move |item| (inv.posting_date, *creation, inv.name.clone(), item.clone()))
            })
            .collect();

        lines.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        lines
            .into_iter()
            .map(|(posting_date, _, name, item)| (posting_date, name, item))
            .collect()
    }
}

#[async_trait]
impl InsightsRepository for InMemoryRepository {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn customer_outstanding_total(
        &self,
        customer: &str,
        company: &str,
    ) -> Result<Decimal, AppError> {
        self.log_call("customer_outstanding_total");
        if self.failures.lock().unwrap().outstanding {
            return Err(injected("customer_outstanding_total"));
        }

        let store = self.store.lock().unwrap();
        Ok(store
            .invoices
            .iter()
            .map(|(inv, _, _)| inv)
            .filter(|inv| {
                inv.customer.as_deref() == Some(customer)
                    && inv.company == company
                    && inv.docstatus == DocStatus::Submitted
                    && inv.outstanding_amount > Decimal::ZERO
            })
            .map(|inv| inv.outstanding_amount)
            .sum())
    }

    async fn company_default_currency(&self, company: &str) -> Result<Option<String>, AppError> {
        self.currency_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.store.lock().unwrap().currencies.get(company).cloned())
    }

    async fn last_selling_rate(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
    ) -> Result<Option<LastRateRow>, AppError> {
        self.log_call("last_selling_rate");
        if self
            .failures
            .lock()
            .unwrap()
            .last_rate_items
            .contains(item_code)
        {
            return Err(injected("last_selling_rate"));
        }

        Ok(self
            .submitted_lines(customer, item_code, company)
            .into_iter()
            .next()
            .map(|(posting_date, invoice_name, item)| LastRateRow {
                last_rate: item.rate,
                posting_date,
                invoice_name,
            }))
    }

    async fn price_history(
        &self,
        customer: &str,
        item_code: &str,
        company: &str,
        limit: i64,
    ) -> Result<Vec<PriceHistoryEntry>, AppError> {
        if self.failures.lock().unwrap().price_history {
            return Err(injected("price_history"));
        }

        Ok(self
            .submitted_lines(customer, item_code, company)
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(posting_date, invoice_name, item)| PriceHistoryEntry {
                rate: item.rate,
                qty: item.qty,
                amount: item.amount,
                posting_date,
                invoice_name,
            })
            .collect())
    }

    async fn get_customer(&self, customer: &str) -> Result<Option<Customer>, AppError> {
        if self.failures.lock().unwrap().get_customer {
            return Err(injected("get_customer"));
        }
        Ok(self.store.lock().unwrap().customers.get(customer).cloned())
    }

    async fn get_sales_invoice(&self, name: &str) -> Result<Option<SalesInvoice>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .invoices
            .iter()
            .find(|(inv, _, _)| inv.name == name)
            .map(|(inv, _, custom_outstanding)| SalesInvoice {
                name: inv.name.clone(),
                customer: inv.customer.clone(),
                company: inv.company.clone(),
                docstatus: inv.docstatus,
                posting_date: Some(inv.posting_date),
                outstanding_amount: inv.outstanding_amount,
                custom_customer_outstanding: *custom_outstanding,
                items: inv.items.clone(),
            }))
    }

    async fn begin(&self) -> Result<Box<dyn DocumentWriter>, AppError> {
        {
            let mut store = self.store.lock().unwrap();
            store.begins += 1;
            store.calls.push("begin");
        }
        let failures = self.failures.lock().unwrap();
        Ok(Box::new(InMemoryWriter {
            store: self.store.clone(),
            fail_commit: failures.commit,
            fail_writes: failures.write_names.clone(),
            pending: Vec::new(),
        }))
    }
}

/// Buffers writes until commit, like a database transaction.
struct InMemoryWriter {
    store: Arc<Mutex<Store>>,
    fail_commit: bool,
    fail_writes: HashSet<String>,
    pending: Vec<FieldUpdate>,
}

#[async_trait]
impl DocumentWriter for InMemoryWriter {
    async fn set_value(&mut self, update: FieldUpdate) -> Result<(), AppError> {
        self.store.lock().unwrap().calls.push("set_value");
        if self.fail_writes.contains(&update.name) {
            return Err(injected("set_value"));
        }
        self.pending.push(update);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        if self.fail_commit {
            return Err(injected("commit"));
        }

        let mut store = self.store.lock().unwrap();
        for update in &self.pending {
            if update.field == CustomField::CustomerOutstanding {
                if let Some(entry) = store
                    .invoices
                    .iter_mut()
                    .find(|(inv, _, _)| inv.name == update.name)
                {
                    entry.2 = Some(update.value);
                }
            }
        }
        store.committed.extend(self.pending.iter().cloned());
        store.commits += 1;
        Ok(())
    }
}

/// Queue that records submissions instead of running them.
#[derive(Default)]
pub struct RecordingQueue {
    requests: Mutex<Vec<EnqueueRequest>>,
    reject: bool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn requests(&self) -> Vec<EnqueueRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl JobQueue for RecordingQueue {
    fn enqueue(&self, request: EnqueueRequest) -> Result<(), AppError> {
        if self.reject {
            return Err(AppError::InternalError(anyhow::anyhow!("Job queue full")));
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}
