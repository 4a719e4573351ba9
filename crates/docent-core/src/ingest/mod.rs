//! Document ingestion
//!
//! The pipeline drives a single document through the state machine
//! `received -> parsed -> chunked -> embedded -> indexed -> complete`;
//! the queue fans submissions out to a small worker pool so a slow
//! embedding provider never blocks the caller.

mod pipeline;
mod queue;

pub use pipeline::IngestionPipeline;
pub use queue::{IngestHandle, IngestQueue};
