//! Scan orchestrator.
//!
//! Drives one scan across every active provider:
//! - **Providers**: concurrent, one task each, pushing into a shared queue
//! - **Merge**: sequential, routes shows to destinations and drops duplicates
//! - **Cancellation**: one shared [`crate::provider::ScanContext`]; the scan
//!   timeout cancels it

mod config;
mod runner;
mod types;

pub use config::ScanConfig;
pub use runner::ScanOrchestrator;
pub use types::{AcceptedShow, DownloadTarget, OrchestratorError, ScanReport};
