//! CLI command handlers

pub mod ask;
pub mod ingest;
pub mod rm;
pub mod status;
