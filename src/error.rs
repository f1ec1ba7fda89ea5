//! Typed failures delivered to callers

use node_rpc::NodeError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("invalid storage address: {0}")]
    MalformedAddress(String),

    #[error("storage node unreachable: {0}")]
    Unreachable(String),

    #[error("storage node did not respond in time")]
    Timeout,

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("initialization cancelled")]
    Cancelled,
}

impl From<NodeError> for InitError {
    fn from(e: NodeError) -> Self {
        if e.is_timeout() {
            InitError::Timeout
        } else {
            InitError::Unreachable(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("cannot open destination: {0}")]
    SinkUnavailable(String),

    #[error("cannot open source: {0}")]
    SourceUnavailable(String),

    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Lazy connection to the node failed before the transfer started
    #[error("offline: {0}")]
    Offline(#[from] InitError),

    #[error("transfer cancelled")]
    Cancelled,
}

impl From<NodeError> for TransferError {
    fn from(e: NodeError) -> Self {
        TransferError::NetworkFailure(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("cannot read file: {0}")]
    SourceUnavailable(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Every poll finished without a completed report
    #[error("scan timeout")]
    Timeout,

    #[error("scan failed: {0}")]
    ReportParseFailed(String),

    #[error("scan client unavailable: {0}")]
    Client(String),

    #[error("scan cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::{InitError, ScanError, TransferError};

    #[test]
    fn messages_read_as_user_facing_causes() {
        assert_eq!(ScanError::Timeout.to_string(), "scan timeout");
        assert_eq!(
            ScanError::ReportParseFailed("missing field `stats`".into()).to_string(),
            "scan failed: missing field `stats`"
        );
        assert_eq!(
            TransferError::from(InitError::Timeout).to_string(),
            "offline: storage node did not respond in time"
        );
    }
}
