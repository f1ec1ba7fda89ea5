//! Malware scanning
//!
//! Submits file content to the scanning service, then polls the analysis
//! report with exponential backoff until it completes or attempts run out.
//! Polling never blocks a worker thread; waits are timer sleeps.

mod api;
mod coordinator;
mod poll;
mod types;

pub use coordinator::ScanCoordinator;
pub use poll::{backoff_delay, classify, AnalysisJob};
pub use types::{ScanVerdict, COMPLETED_STATUS};
