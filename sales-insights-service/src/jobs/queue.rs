use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Named queues, mirroring the host's worker pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Short,
    Default,
    Long,
}

impl QueueName {
    pub const ALL: [QueueName; 3] = [QueueName::Short, QueueName::Default, QueueName::Long];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Short => "short",
            QueueName::Default => "default",
            QueueName::Long => "long",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueName {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(QueueName::Short),
            "default" => Ok(QueueName::Default),
            "long" => Ok(QueueName::Long),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown queue '{}'",
                other
            ))),
        }
    }
}

/// Work that can be scheduled, with its keyword arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "kwargs", rename_all = "snake_case")]
pub enum Job {
    /// Recompute and store the custom fields of one Sales Invoice.
    UpdateCustomFieldsBackground { doc_name: String },
}

impl Job {
    pub fn method(&self) -> &'static str {
        match self {
            Job::UpdateCustomFieldsBackground { .. } => "update_custom_fields_background",
        }
    }
}

/// A job plus where and how long it may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueRequest {
    pub job: Job,
    pub queue: QueueName,
    pub timeout: Duration,
}

/// Fire-and-forget submission. `Ok` means accepted, not executed.
pub trait JobQueue: Send + Sync {
    fn enqueue(&self, request: EnqueueRequest) -> Result<(), AppError>;
}

/// Executes dequeued jobs.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: Job) -> Result<(), AppError>;
}
