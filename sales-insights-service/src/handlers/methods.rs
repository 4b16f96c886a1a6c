//! Remote methods called from the Sales Invoice form.
//!
//! Lookup failures never reach the form: they are logged and answered with a
//! zero/empty default so the invoice workflow is not blocked.

use super::AppState;
use crate::models::{CreditInfo, CustomerOutstanding, LastSellingRate, PriceHistoryEntry};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Host-style method response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct MethodResponse<T> {
    pub message: T,
}

fn respond<T>(
    method: &str,
    result: Result<T, AppError>,
    default: impl FnOnce() -> T,
) -> Json<MethodResponse<T>> {
    let message = result.unwrap_or_else(|e| {
        tracing::error!(method = method, error = %e, "Error in {}", method);
        default()
    });
    Json(MethodResponse { message })
}

#[derive(Debug, Deserialize)]
pub struct CustomerCompanyParams {
    pub customer: String,
    pub company: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemParams {
    pub customer: String,
    pub item_code: String,
    pub company: String,
}

#[derive(Debug, Deserialize)]
pub struct PriceHistoryParams {
    pub customer: String,
    pub item_code: String,
    pub company: String,
    pub limit: Option<i64>,
}

pub async fn get_customer_outstanding(
    State(state): State<AppState>,
    Query(params): Query<CustomerCompanyParams>,
) -> Json<MethodResponse<CustomerOutstanding>> {
    let result = state
        .insights
        .get_customer_outstanding(&params.customer, &params.company)
        .await;
    respond("get_customer_outstanding", result, || {
        CustomerOutstanding::fallback(state.insights.fallback_currency())
    })
}

pub async fn get_customer_last_rate(
    State(state): State<AppState>,
    Query(params): Query<ItemParams>,
) -> Json<MethodResponse<LastSellingRate>> {
    let result = state
        .insights
        .get_customer_last_rate(&params.customer, &params.item_code, &params.company)
        .await;
    respond("get_customer_last_rate", result, LastSellingRate::default)
}

pub async fn get_item_price_history(
    State(state): State<AppState>,
    Query(params): Query<PriceHistoryParams>,
) -> Json<MethodResponse<Vec<PriceHistoryEntry>>> {
    let result = state
        .insights
        .get_item_price_history(
            &params.customer,
            &params.item_code,
            &params.company,
            params.limit,
        )
        .await;
    respond("get_item_price_history", result, Vec::new)
}

pub async fn get_customer_credit_info(
    State(state): State<AppState>,
    Query(params): Query<CustomerCompanyParams>,
) -> Json<MethodResponse<CreditInfo>> {
    let result = state
        .insights
        .get_customer_credit_info(&params.customer, &params.company)
        .await;
    respond("get_customer_credit_info", result, CreditInfo::default)
}
