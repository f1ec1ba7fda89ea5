use thiserror::Error;

/// Failure of a single node RPC call
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("node returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("invalid endpoint: {0}")]
    InvalidUrl(String),

    #[error("node returned an empty response")]
    EmptyResponse,
}

impl NodeError {
    /// True when the call gave up waiting (connect or read timeout)
    pub fn is_timeout(&self) -> bool {
        matches!(self, NodeError::Request(e) if e.is_timeout())
    }
}
