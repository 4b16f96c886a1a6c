//! Sales Invoice model as read from the host ERP.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{SALES_INVOICE, SALES_INVOICE_ITEM};

/// Document lifecycle flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(into = "i16", try_from = "i16")]
pub enum DocStatus {
    #[default]
    Draft,
    Submitted,
    Cancelled,
}

impl DocStatus {
    pub fn as_i16(&self) -> i16 {
        match self {
            DocStatus::Draft => 0,
            DocStatus::Submitted => 1,
            DocStatus::Cancelled => 2,
        }
    }

    pub fn from_i16(value: i16) -> Option<Self> {
        match value {
            0 => Some(DocStatus::Draft),
            1 => Some(DocStatus::Submitted),
            2 => Some(DocStatus::Cancelled),
            _ => None,
        }
    }
}

impl From<DocStatus> for i16 {
    fn from(status: DocStatus) -> Self {
        status.as_i16()
    }
}

impl TryFrom<i16> for DocStatus {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        DocStatus::from_i16(value).ok_or_else(|| format!("invalid docstatus {}", value))
    }
}

/// Sales Invoice header with its line items.
///
/// Also the payload the host posts with document events, so everything but
/// `name` is optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesInvoice {
    pub name: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub docstatus: DocStatus,
    #[serde(default)]
    pub posting_date: Option<NaiveDate>,
    #[serde(default)]
    pub outstanding_amount: Decimal,
    #[serde(default)]
    pub custom_customer_outstanding: Option<Decimal>,
    #[serde(default)]
    pub items: Vec<SalesInvoiceItem>,
}

impl SalesInvoice {
    /// Customer name, treating an empty string like a missing link.
    pub fn customer(&self) -> Option<&str> {
        self.customer.as_deref().filter(|c| !c.is_empty())
    }
}

/// A single Sales Invoice Item row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesInvoiceItem {
    pub name: String,
    #[serde(default)]
    pub idx: i64,
    #[serde(default)]
    pub item_code: Option<String>,
    #[serde(default)]
    pub qty: Decimal,
    #[serde(default)]
    pub rate: Decimal,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub custom_customer_last_rate: Option<Decimal>,
}

impl SalesInvoiceItem {
    pub fn item_code(&self) -> Option<&str> {
        self.item_code.as_deref().filter(|c| !c.is_empty())
    }
}

/// Custom fields this service owns on host documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomField {
    /// `Sales Invoice.custom_customer_outstanding`
    CustomerOutstanding,
    /// `Sales Invoice Item.custom_customer_last_rate`
    CustomerLastRate,
}

impl CustomField {
    pub fn doctype(&self) -> &'static str {
        match self {
            CustomField::CustomerOutstanding => SALES_INVOICE,
            CustomField::CustomerLastRate => SALES_INVOICE_ITEM,
        }
    }

    pub fn fieldname(&self) -> &'static str {
        match self {
            CustomField::CustomerOutstanding => "custom_customer_outstanding",
            CustomField::CustomerLastRate => "custom_customer_last_rate",
        }
    }
}

/// A direct single-field write on a host record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: CustomField,
    /// Record name (the invoice or the item row).
    pub name: String,
    pub value: Decimal,
    /// Bump the record's `modified` timestamp.
    pub update_modified: bool,
}
