//! Hook registry: which document events this app handles and which assets it
//! injects into the host desk.

use crate::jobs::{EnqueueRequest, Job, JobQueue, QueueName};
use crate::models::{SalesInvoice, SALES_INVOICE};
use crate::services::metrics::HOOK_EVENTS_TOTAL;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const APP_NAME: &str = "safa";

/// Timeout for the custom-field refresh on the short queue.
pub const UPDATE_JOB_TIMEOUT: Duration = Duration::from_secs(60);

/// Document lifecycle events the host can notify us about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocEvent {
    AfterInsert,
    OnSubmit,
}

impl DocEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocEvent::AfterInsert => "after_insert",
            DocEvent::OnSubmit => "on_submit",
        }
    }
}

impl fmt::Display for DocEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "after_insert" => Ok(DocEvent::AfterInsert),
            "on_submit" => Ok(DocEvent::OnSubmit),
            other => Err(format!("unsupported document event '{}'", other)),
        }
    }
}

pub type HookHandler = fn(&SalesInvoice, &dyn JobQueue);

/// Declarative hook table.
pub struct Hooks {
    pub doc_events: Vec<(&'static str, DocEvent, HookHandler)>,
    pub app_include_js: Vec<String>,
    pub app_include_css: Vec<String>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            doc_events: vec![
                (
                    SALES_INVOICE,
                    DocEvent::AfterInsert,
                    after_insert_sales_invoice as HookHandler,
                ),
                (
                    SALES_INVOICE,
                    DocEvent::OnSubmit,
                    on_submit_sales_invoice as HookHandler,
                ),
            ],
            app_include_js: vec![format!("/assets/{}/js/sales_invoice.js", APP_NAME)],
            app_include_css: vec![format!("/assets/{}/css/{}.css", APP_NAME, APP_NAME)],
        }
    }
}

impl Hooks {
    pub fn handler_for(&self, doctype: &str, event: DocEvent) -> Option<HookHandler> {
        self.doc_events
            .iter()
            .find(|(d, e, _)| *d == doctype && *e == event)
            .map(|(_, _, handler)| *handler)
    }

    /// Run the handler bound to `doctype`/`event`. Returns whether one ran.
    pub fn dispatch(
        &self,
        doctype: &str,
        event: DocEvent,
        doc: &SalesInvoice,
        queue: &dyn JobQueue,
    ) -> bool {
        let Some(handler) = self.handler_for(doctype, event) else {
            tracing::debug!(doctype = %doctype, event = %event, "No hook registered");
            return false;
        };

        HOOK_EVENTS_TOTAL
            .with_label_values(&[doctype, event.as_str()])
            .inc();
        handler(doc, queue);
        true
    }
}

fn enqueue_custom_field_update(hook: &str, doc: &SalesInvoice, queue: &dyn JobQueue) {
    let request = EnqueueRequest {
        job: Job::UpdateCustomFieldsBackground {
            doc_name: doc.name.clone(),
        },
        queue: QueueName::Short,
        timeout: UPDATE_JOB_TIMEOUT,
    };

    if let Err(e) = queue.enqueue(request) {
        tracing::error!(hook = hook, invoice = %doc.name, error = %e, "Error in {}", hook);
    }
}

/// Called after a Sales Invoice is inserted.
pub fn after_insert_sales_invoice(doc: &SalesInvoice, queue: &dyn JobQueue) {
    enqueue_custom_field_update("after_insert_sales_invoice", doc, queue);
}

/// Called when a Sales Invoice is submitted.
pub fn on_submit_sales_invoice(doc: &SalesInvoice, queue: &dyn JobQueue) {
    enqueue_custom_field_update("on_submit_sales_invoice", doc, queue);
}
