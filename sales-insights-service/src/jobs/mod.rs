//! Background job queue.
//!
//! Jobs are delivered at most once: they live in memory, are dropped on
//! process exit, and are not retried. Each job runs under its own timeout.

mod queue;
mod worker;

pub use queue::{EnqueueRequest, Job, JobHandler, JobQueue, QueueName};
pub use worker::InProcessQueue;
