//! Customer model with its per-company credit limits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub customer_name: Option<String>,
    /// Child rows in host order (`idx`).
    pub credit_limits: Vec<CustomerCreditLimit>,
}

/// One row of the Customer Credit Limit child table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerCreditLimit {
    pub company: String,
    pub credit_limit: Decimal,
}

impl Customer {
    /// Credit limit for `company`; the first matching row wins, zero if none.
    pub fn credit_limit_for(&self, company: &str) -> Decimal {
        self.credit_limits
            .iter()
            .find(|limit| limit.company == company)
            .map(|limit| limit.credit_limit)
            .unwrap_or(Decimal::ZERO)
    }
}
