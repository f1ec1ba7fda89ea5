//! Scan verdicts, phases and the service's wire types

use serde::Deserialize;

/// Report status that ends polling
pub const COMPLETED_STATUS: &str = "completed";

/// Classified result of a completed analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanVerdict {
    malicious: u32,
    suspicious: u32,
    clean: u32,
}

impl ScanVerdict {
    pub fn new(malicious: u32, suspicious: u32, clean: u32) -> Self {
        Self {
            malicious,
            suspicious,
            clean,
        }
    }

    pub fn malicious(&self) -> u32 {
        self.malicious
    }

    pub fn suspicious(&self) -> u32 {
        self.suspicious
    }

    /// Engines that reported nothing (the report's `undetected`)
    pub fn clean(&self) -> u32 {
        self.clean
    }

    pub fn is_infected(&self) -> bool {
        self.malicious > 0 || self.suspicious > 0
    }
}

impl From<AnalysisStats> for ScanVerdict {
    fn from(stats: AnalysisStats) -> Self {
        Self::new(stats.malicious, stats.suspicious, stats.undetected)
    }
}

/// Step of one scan, as reported in log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanPhase {
    Submitting,
    Waiting,
    Polling,
    Completed,
    Exhausted,
    Failed,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScanPhase::Submitting => "submitting",
            ScanPhase::Waiting => "waiting",
            ScanPhase::Polling => "polling",
            ScanPhase::Completed => "completed",
            ScanPhase::Exhausted => "exhausted",
            ScanPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Every service response wraps its payload in `data`
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Submitted {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Analysis<A> {
    pub attributes: A,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusAttributes {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsAttributes {
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct AnalysisStats {
    pub malicious: u32,
    pub suspicious: u32,
    pub undetected: u32,
}

#[cfg(test)]
mod tests {
    use super::{ScanPhase, ScanVerdict};

    #[test]
    fn phases_render_lowercase_in_logs() {
        assert_eq!(ScanPhase::Submitting.to_string(), "submitting");
        assert_eq!(ScanPhase::Exhausted.to_string(), "exhausted");
    }

    #[test]
    fn infected_when_any_malicious_or_suspicious() {
        assert!(ScanVerdict::new(2, 0, 50).is_infected());
        assert!(ScanVerdict::new(0, 1, 50).is_infected());
        assert!(!ScanVerdict::new(0, 0, 50).is_infected());
    }
}
