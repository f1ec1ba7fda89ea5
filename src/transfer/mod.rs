//! Storage node transfers
//!
//! Provides the node-facing half of the workflow with:
//! - Lazy, retryable connection to the node
//! - Liveness checks that always resolve within a bounded time
//! - Uploads spooled through a temp file that is removed on every exit path
//! - Downloads validated up front, streamed in 8 KiB chunks to a staging file
//!   that replaces the destination only once complete
//! - A bounded worker pool with callbacks delivered on the caller's context

mod client;
mod types;
mod worker;

pub use client::TransferClient;
pub use types::Liveness;
