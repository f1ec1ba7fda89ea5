//! ScanCoordinator - submit, poll with backoff, classify

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::api::ScanApi;
use super::poll::{classify, log_phase, poll_until_complete, AnalysisJob};
use super::types::{ScanPhase, ScanVerdict};
use crate::completion::CompletionContext;
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::pool::{TaskHandle, WorkerPool};

/// Submits content for analysis and polls until a verdict is available.
///
/// Scans run one at a time on a dedicated single-worker pool.
#[derive(Clone)]
pub struct ScanCoordinator {
    api: Arc<ScanApi>,
    config: Arc<ScanConfig>,
    pool: Arc<WorkerPool>,
    completion: Arc<dyn CompletionContext>,
}

impl ScanCoordinator {
    pub fn new(
        config: ScanConfig,
        completion: Arc<dyn CompletionContext>,
    ) -> Result<Self, ScanError> {
        let pool = WorkerPool::new("scan", 1).map_err(|e| ScanError::Client(e.to_string()))?;
        Self::with_pool(config, Arc::new(pool), completion)
    }

    pub fn with_pool(
        config: ScanConfig,
        pool: Arc<WorkerPool>,
        completion: Arc<dyn CompletionContext>,
    ) -> Result<Self, ScanError> {
        let api = ScanApi::new(&config)?;
        Ok(Self {
            api: Arc::new(api),
            config: Arc::new(config),
            pool,
            completion,
        })
    }

    /// Cancel queued and running scans
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    pub fn scan_file<F>(&self, path: impl Into<PathBuf>, on_done: F) -> TaskHandle
    where
        F: FnOnce(Result<ScanVerdict, ScanError>) + Send + 'static,
    {
        let api = self.api.clone();
        let config = self.config.clone();
        let path = path.into();
        self.pool.submit(
            &self.completion,
            async move { scan_file(&api, &config, &path).await },
            Err(ScanError::Cancelled),
            on_done,
        )
    }

    pub async fn scan_file_async(&self, path: impl AsRef<Path>) -> Result<ScanVerdict, ScanError> {
        scan_file(&self.api, &self.config, path.as_ref()).await
    }

    pub async fn scan_bytes_async(&self, content: Vec<u8>) -> Result<ScanVerdict, ScanError> {
        scan_bytes(&self.api, &self.config, content).await
    }
}

async fn scan_file(
    api: &ScanApi,
    config: &ScanConfig,
    path: &Path,
) -> Result<ScanVerdict, ScanError> {
    // The whole file is held in memory for the multipart body
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| ScanError::SourceUnavailable(format!("{}: {}", path.display(), e)))?;
    scan_bytes(api, config, content).await
}

async fn scan_bytes(
    api: &ScanApi,
    config: &ScanConfig,
    content: Vec<u8>,
) -> Result<ScanVerdict, ScanError> {
    let detail = format!("bytes={}", content.len());
    log_phase("-", ScanPhase::Submitting, Some(&detail));

    let analysis_id = match api.submit(content).await {
        Ok(id) => id,
        Err(e) => {
            log_phase("-", ScanPhase::Failed, Some(&e.to_string()));
            return Err(e);
        }
    };

    let mut job = AnalysisJob::from_config(analysis_id, config);
    let id = job.analysis_id().to_string();
    let report = poll_until_complete(&mut job, || api.fetch_report(&id)).await?;

    classify(&report).inspect_err(|e| {
        log_phase(&id, ScanPhase::Failed, Some(&e.to_string()));
    })
}
