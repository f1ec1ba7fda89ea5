//! Collapse operation results into what a caller shows the user

use crate::error::{InitError, ScanError, TransferError};
use crate::scan::ScanVerdict;
use crate::transfer::Liveness;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Transfer or init finished
    Completed,
    Clean(ScanVerdict),
    Offline(String),
    InvalidInput(String),
    ScanTimedOut,
    ScanFailed(String),
    /// The user may still choose to proceed
    Infected(ScanVerdict),
    Cancelled,
}

impl Outcome {
    pub fn from_init(result: &Result<(), InitError>) -> Self {
        match result {
            Ok(()) => Outcome::Completed,
            Err(InitError::MalformedAddress(cause)) => Outcome::InvalidInput(cause.clone()),
            Err(InitError::Cancelled) => Outcome::Cancelled,
            Err(e) => Outcome::Offline(e.to_string()),
        }
    }

    pub fn from_transfer<T>(result: &Result<T, TransferError>) -> Self {
        match result {
            Ok(_) => Outcome::Completed,
            Err(TransferError::InvalidHash(hash)) => Outcome::InvalidInput(hash.clone()),
            Err(TransferError::SinkUnavailable(cause))
            | Err(TransferError::SourceUnavailable(cause)) => Outcome::InvalidInput(cause.clone()),
            Err(TransferError::Offline(e)) => Outcome::from_init(&Err(e.clone())),
            Err(TransferError::NetworkFailure(cause)) => Outcome::Offline(cause.clone()),
            Err(TransferError::Cancelled) => Outcome::Cancelled,
        }
    }

    pub fn from_scan(result: &Result<ScanVerdict, ScanError>) -> Self {
        match result {
            Ok(verdict) if verdict.is_infected() => Outcome::Infected(*verdict),
            Ok(verdict) => Outcome::Clean(*verdict),
            Err(ScanError::Timeout) => Outcome::ScanTimedOut,
            Err(ScanError::SourceUnavailable(cause)) => Outcome::InvalidInput(cause.clone()),
            Err(ScanError::Cancelled) => Outcome::Cancelled,
            Err(e) => Outcome::ScanFailed(e.to_string()),
        }
    }

    pub fn from_liveness(liveness: &Liveness) -> Self {
        if liveness.online {
            Outcome::Completed
        } else {
            Outcome::Offline(liveness.detail.clone())
        }
    }

    pub fn allows_override(&self) -> bool {
        matches!(self, Outcome::Infected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Outcome;
    use crate::error::{InitError, ScanError, TransferError};
    use crate::scan::ScanVerdict;
    use crate::transfer::Liveness;

    #[test]
    fn infected_is_the_only_overridable_outcome() {
        let infected = Outcome::from_scan(&Ok(ScanVerdict::new(2, 0, 50)));
        assert_eq!(infected, Outcome::Infected(ScanVerdict::new(2, 0, 50)));
        assert!(infected.allows_override());

        let clean = Outcome::from_scan(&Ok(ScanVerdict::new(0, 0, 50)));
        assert_eq!(clean, Outcome::Clean(ScanVerdict::new(0, 0, 50)));
        assert!(!clean.allows_override());

        assert!(!Outcome::from_scan(&Err(ScanError::Timeout)).allows_override());
    }

    #[test]
    fn scan_failures_split_into_timeout_and_failed() {
        assert_eq!(
            Outcome::from_scan(&Err(ScanError::Timeout)),
            Outcome::ScanTimedOut
        );
        assert!(matches!(
            Outcome::from_scan(&Err(ScanError::UploadFailed("HTTP 401".into()))),
            Outcome::ScanFailed(_)
        ));
        assert!(matches!(
            Outcome::from_scan(&Err(ScanError::ReportParseFailed("missing".into()))),
            Outcome::ScanFailed(_)
        ));
    }

    #[test]
    fn transfer_failures_map_to_offline_or_invalid_input() {
        let bad_hash: Result<u64, _> = Err(TransferError::InvalidHash("abc".into()));
        assert_eq!(
            Outcome::from_transfer(&bad_hash),
            Outcome::InvalidInput("abc".into())
        );

        let offline: Result<u64, _> = Err(TransferError::Offline(InitError::Timeout));
        assert!(matches!(Outcome::from_transfer(&offline), Outcome::Offline(_)));

        let network: Result<u64, _> = Err(TransferError::NetworkFailure("reset".into()));
        assert_eq!(
            Outcome::from_transfer(&network),
            Outcome::Offline("reset".into())
        );

        assert_eq!(Outcome::from_transfer(&Ok::<u64, TransferError>(12)), Outcome::Completed);
    }

    #[test]
    fn offline_liveness_keeps_its_detail() {
        let outcome = Outcome::from_liveness(&Liveness::offline(""));
        assert_eq!(outcome, Outcome::Offline("Connection failed".into()));
        assert_eq!(
            Outcome::from_liveness(&Liveness::online()),
            Outcome::Completed
        );
    }
}
