//! Transfer result payloads

/// Spool file naming for uploads
pub(crate) const SPOOL_PREFIX: &str = "ipfs_upload";
pub(crate) const SPOOL_SUFFIX: &str = ".tmp";

/// Hidden sibling of a download destination until the copy completes
pub(crate) const STAGING_PREFIX: &str = ".zerobyte";
pub(crate) const STAGING_SUFFIX: &str = ".part";

/// Result of a liveness round-trip; never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    pub online: bool,
    pub detail: String,
}

impl Liveness {
    pub(crate) fn online() -> Self {
        Self {
            online: true,
            detail: "Connected".to_string(),
        }
    }

    /// `detail` is always non-empty
    pub(crate) fn offline(cause: impl Into<String>) -> Self {
        let cause = cause.into();
        let detail = if cause.trim().is_empty() {
            "Connection failed".to_string()
        } else {
            cause
        };
        Self {
            online: false,
            detail,
        }
    }
}
