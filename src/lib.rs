//! Content-addressed file transfer with malware scanning
//!
//! Two independent clients:
//! - [`TransferClient`] uploads to and downloads from a storage node by content
//!   hash, and reports whether the node is reachable
//! - [`ScanCoordinator`] submits content to a scanning service and polls with
//!   exponential backoff until a [`ScanVerdict`] is ready
//!
//! The `*_async` methods carry each operation. The callback forms run them on
//! a bounded worker pool and deliver the result through a [`CompletionContext`]. [`Outcome`] folds any result into
//! the small set of states a caller presents to the user.

mod address;
mod completion;
mod config;
mod error;
mod hash;
mod outcome;
mod pool;
pub mod scan;
pub mod transfer;

pub use address::StorageAddress;
pub use completion::{Callback, CompletionContext, CompletionQueue};
pub use config::{ScanConfig, TransferConfig};
pub use error::{InitError, ScanError, TransferError};
pub use hash::{is_valid_hash, ContentHash};
pub use outcome::Outcome;
pub use pool::{TaskHandle, WorkerPool};
pub use scan::{ScanCoordinator, ScanVerdict};
pub use transfer::{Liveness, TransferClient};
