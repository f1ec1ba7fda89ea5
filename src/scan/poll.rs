//! Report polling with exponential backoff, and verdict classification

use log::{info, warn};
use std::future::Future;
use std::time::Duration;

use super::types::{
    Analysis, Envelope, ScanPhase, ScanVerdict, StatsAttributes, StatusAttributes,
    COMPLETED_STATUS,
};
use crate::config::ScanConfig;
use crate::error::ScanError;

/// Delay before 0-indexed `attempt`: `base * 2^attempt`, saturating
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

pub(crate) fn log_phase(analysis_id: &str, phase: ScanPhase, detail: Option<&str>) {
    match (phase, detail) {
        (ScanPhase::Exhausted | ScanPhase::Failed, Some(detail)) => {
            warn!("scan_status: {} -> {} error={}", analysis_id, phase, detail)
        }
        (_, Some(detail)) => info!("scan_status: {} -> {} {}", analysis_id, phase, detail),
        (_, None) => info!("scan_status: {} -> {}", analysis_id, phase),
    }
}

/// One in-flight analysis: its id and where the poll loop stands
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    analysis_id: String,
    attempt: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl AnalysisJob {
    pub fn new(analysis_id: impl Into<String>, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            analysis_id: analysis_id.into(),
            attempt: 0,
            max_attempts,
            base_delay,
        }
    }

    pub(crate) fn from_config(analysis_id: String, config: &ScanConfig) -> Self {
        Self::new(analysis_id, config.max_attempts, config.base_delay)
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    /// 0-indexed attempt that runs next
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn current_delay(&self) -> Duration {
        backoff_delay(self.base_delay, self.attempt)
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    fn advance(&mut self) {
        self.attempt += 1;
    }
}

fn report_status(report: &str) -> Result<String, String> {
    serde_json::from_str::<Envelope<Analysis<StatusAttributes>>>(report)
        .map(|envelope| envelope.data.attributes.status)
        .map_err(|e| format!("Malformed report: {}", e))
}

/// Sleep, fetch, repeat until the report says completed. A failed fetch only
/// costs its attempt; running out of attempts is `ScanError::Timeout`.
pub(crate) async fn poll_until_complete<F, Fut>(
    job: &mut AnalysisJob,
    mut fetch: F,
) -> Result<String, ScanError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, String>>,
{
    while !job.is_exhausted() {
        let delay = job.current_delay();
        let detail = format!("attempt={} delay_ms={}", job.attempt() + 1, delay.as_millis());
        log_phase(job.analysis_id(), ScanPhase::Waiting, Some(&detail));
        tokio::time::sleep(delay).await;

        log_phase(job.analysis_id(), ScanPhase::Polling, None);
        let polled = fetch()
            .await
            .and_then(|report| report_status(&report).map(|status| (status, report)));
        match polled {
            Ok((status, report)) if status == COMPLETED_STATUS => {
                log_phase(job.analysis_id(), ScanPhase::Completed, None);
                return Ok(report);
            }
            Ok((status, _)) => {
                info!(
                    "scan_poll: {} attempt {} status={}",
                    job.analysis_id(),
                    job.attempt() + 1,
                    status
                );
            }
            Err(e) => {
                warn!(
                    "scan_poll: {} attempt {} failed: {}",
                    job.analysis_id(),
                    job.attempt() + 1,
                    e
                );
            }
        }
        job.advance();
    }

    log_phase(job.analysis_id(), ScanPhase::Exhausted, Some("scan timeout"));
    Err(ScanError::Timeout)
}

/// Turn a completed report into a verdict
pub fn classify(report: &str) -> Result<ScanVerdict, ScanError> {
    serde_json::from_str::<Envelope<Analysis<StatsAttributes>>>(report)
        .map(|envelope| ScanVerdict::from(envelope.data.attributes.stats))
        .map_err(|e| ScanError::ReportParseFailed(e.to_string()))
}
