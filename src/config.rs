//! Caller-supplied configuration for the transfer client and scan coordinator

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Concurrent storage operations per client
pub const DEFAULT_TRANSFER_WORKERS: usize = 3;

/// Copy size for download writes (8 KiB)
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// Report polls per scan before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 7;

/// First backoff delay; doubles on every attempt
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(4_000);

pub const DEFAULT_SCAN_BASE_URL: &str = "https://www.virustotal.com/api/v3";

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Multiaddress of the storage node, e.g. `/ip4/127.0.0.1/tcp/5001`
    pub address: String,
    pub workers: usize,
    /// Directory for upload spool files; the OS temp dir when unset
    pub spool_dir: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub read_timeout: Duration,
    pub liveness_timeout: Duration,
}

impl TransferConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            workers: DEFAULT_TRANSFER_WORKERS,
            spool_dir: None,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(30),
            liveness_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct ScanConfig {
    /// Service root; `/files` and `/analyses/<id>` are appended
    pub base_url: String,
    /// Sent as `x-apikey` on every request
    pub api_key: String,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub connect_timeout: Duration,
    /// Sized for the largest expected upload
    pub request_timeout: Duration,
}

impl ScanConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_SCAN_BASE_URL.to_string(),
            api_key: api_key.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(120),
        }
    }
}

// Keeps the credential out of logs
impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .finish()
    }
}
