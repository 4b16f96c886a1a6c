//! Sales Insights Service - customer outstanding, last rates, price history
//! and credit utilization for Sales Invoices.

pub mod config;
pub mod handlers;
pub mod hooks;
pub mod jobs;
pub mod models;
pub mod services;
pub mod startup;
