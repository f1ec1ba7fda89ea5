//! Async client for a content-addressed storage node's HTTP RPC API
//!
//! Only the calls the transfer layer consumes are exposed:
//! - `add`: store one content object and return its hash
//! - `cat`: stream an object's bytes by hash
//! - `refs/local`: list locally stored references (cheap liveness round-trip)

mod client;
mod error;
mod types;

pub use client::{ByteStream, NodeClient, NodeClientOptions};
pub use error::NodeError;
pub use types::{AddedObject, LocalRef};
