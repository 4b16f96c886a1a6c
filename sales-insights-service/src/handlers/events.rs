//! Document event ingress from the host.

use super::AppState;
use crate::hooks::DocEvent;
use crate::models::SalesInvoice;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;

#[derive(Debug, Serialize)]
pub struct DocEventBinding {
    pub doctype: String,
    pub event: String,
}

#[derive(Debug, Serialize)]
pub struct HooksResponse {
    pub doc_events: Vec<DocEventBinding>,
    pub app_include_js: Vec<String>,
    pub app_include_css: Vec<String>,
}

/// Registered event bindings and the assets to include in the host page.
pub async fn list_hooks(State(state): State<AppState>) -> Json<HooksResponse> {
    let hooks = &state.hooks;
    Json(HooksResponse {
        doc_events: hooks
            .doc_events
            .iter()
            .map(|(doctype, event, _)| DocEventBinding {
                doctype: doctype.to_string(),
                event: event.as_str().to_string(),
            })
            .collect(),
        app_include_js: hooks.app_include_js.clone(),
        app_include_css: hooks.app_include_css.clone(),
    })
}

/// Accepts a document event and runs the bound hook.
///
/// Always `202 Accepted` once the document parses: an unbound event or a
/// failed enqueue must not fail the host's insert/submit.
pub async fn document_event(
    State(state): State<AppState>,
    Path((doctype, event)): Path<(String, String)>,
    Json(doc): Json<Value>,
) -> Result<StatusCode, AppError> {
    let event = match event.parse::<DocEvent>() {
        Ok(event) => event,
        Err(reason) => {
            tracing::debug!(doctype = %doctype, reason = %reason, "Ignoring document event");
            return Ok(StatusCode::ACCEPTED);
        }
    };

    if state.hooks.handler_for(&doctype, event).is_none() {
        tracing::debug!(doctype = %doctype, event = %event, "No hook registered");
        return Ok(StatusCode::ACCEPTED);
    }

    let doc: SalesInvoice = serde_json::from_value(doc).map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Invalid {} document: {}", doctype, e))
    })?;

    tracing::info!(doctype = %doctype, event = %event, name = %doc.name, "Document event received");
    state
        .hooks
        .dispatch(&doctype, event, &doc, state.queue.as_ref());

    Ok(StatusCode::ACCEPTED)
}
