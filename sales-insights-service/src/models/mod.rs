//! Domain models for sales-insights-service.

mod customer;
mod insights;
mod invoice;

pub use customer::{Customer, CustomerCreditLimit};
pub use insights::{
    CreditInfo, CustomerOutstanding, LastSellingRate, PriceHistoryEntry, AMOUNT_PRECISION,
};
pub use invoice::{CustomField, DocStatus, FieldUpdate, SalesInvoice, SalesInvoiceItem};

/// Host document type names.
pub const SALES_INVOICE: &str = "Sales Invoice";
pub const SALES_INVOICE_ITEM: &str = "Sales Invoice Item";
pub const CUSTOMER: &str = "Customer";
