//! Derived customer insights returned by the lookups.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Decimal places for every reported amount.
pub const AMOUNT_PRECISION: u32 = 2;

/// Customer outstanding balance within one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOutstanding {
    #[serde(with = "rust_decimal::serde::float")]
    pub outstanding_amount: Decimal,
    pub currency: Option<String>,
}

impl CustomerOutstanding {
    /// Zero balance reported in `currency`, used when the lookup fails.
    pub fn fallback(currency: &str) -> Self {
        Self {
            outstanding_amount: Decimal::ZERO,
            currency: Some(currency.to_string()),
        }
    }
}

/// Last rate the customer was billed for an item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LastSellingRate {
    #[serde(with = "rust_decimal::serde::float")]
    pub last_rate: Decimal,
    pub last_invoice_date: Option<NaiveDate>,
    pub last_invoice: Option<String>,
}

/// One submitted invoice line in a customer's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriceHistoryEntry {
    #[serde(with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub qty: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub posting_date: NaiveDate,
    pub invoice_name: String,
}

/// Credit limit usage for a customer within one company.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreditInfo {
    #[serde(with = "rust_decimal::serde::float")]
    pub credit_limit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub used_credit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub available_credit: Decimal,
    /// Percentage of the limit in use; zero when there is no limit.
    #[serde(with = "rust_decimal::serde::float")]
    pub credit_utilization: Decimal,
}

impl CreditInfo {
    pub fn compute(credit_limit: Decimal, used_credit: Decimal) -> Self {
        let credit_utilization = if credit_limit > Decimal::ZERO {
            used_credit
                .checked_div(credit_limit)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|pct| pct.round_dp(AMOUNT_PRECISION))
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        Self {
            credit_limit,
            used_credit,
            available_credit: credit_limit - used_credit,
            credit_utilization,
        }
    }
}
