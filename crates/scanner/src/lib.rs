//! Scan orchestration.
//!
//! Drives a scan session through discovery, batched crawling, and
//! completion. Resumability comes from the caller invoking
//! [`orchestrator::ScanOrchestrator::process_batch`] repeatedly; there is
//! no background worker.

pub mod orchestrator;

pub use orchestrator::{BatchOutcome, ScanError, ScanOrchestrator, StartOutcome};
