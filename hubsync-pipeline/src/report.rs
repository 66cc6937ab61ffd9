//! Summary of one sync run.

use hubsync_core::Completeness;
use serde::Serialize;
use std::fmt;

/// What a run saw and wrote.
///
/// `listing` and `details` record whether the two remote stages finished or
/// stopped early on an error. Rows from a partial run are still written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub remote_count: usize,
    pub local_count: usize,
    pub net_new_count: usize,
    pub fetched_count: usize,
    pub rows_inserted: u64,
    pub chunks_written: usize,
    pub listing: Completeness,
    pub details: Completeness,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.listing.is_complete() && self.details.is_complete()
    }

    /// Reason the run is partial, if it is.
    pub fn partial_reason(&self) -> Option<String> {
        let reasons: Vec<String> = [("listing", &self.listing), ("details", &self.details)]
            .into_iter()
            .filter(|(_, c)| !c.is_complete())
            .map(|(stage, c)| format!("{} {}", stage, c))
            .collect();

        (!reasons.is_empty()).then(|| reasons.join("; "))
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inserted {} rows", self.rows_inserted)?;
        match self.partial_reason() {
            None => write!(f, " (complete)"),
            Some(reason) => write!(f, " (partial: {})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubsync_core::FailurePolicy;

    fn report(listing: Completeness, details: Completeness) -> SyncReport {
        SyncReport {
            remote_count: 5,
            local_count: 3,
            net_new_count: 2,
            fetched_count: 2,
            rows_inserted: 2,
            chunks_written: 1,
            listing,
            details,
        }
    }

    #[test]
    fn test_complete_report_display() {
        let r = report(Completeness::Complete, Completeness::Complete);
        assert!(r.is_complete());
        assert_eq!(r.to_string(), "Inserted 2 rows (complete)");
    }

    #[test]
    fn test_partial_report_names_the_stage() {
        let r = report(
            Completeness::Complete,
            Completeness::partial(FailurePolicy::AbortKeepPartialOnError, "batch 2 of 3 failed"),
        );
        assert!(!r.is_complete());
        assert_eq!(
            r.to_string(),
            "Inserted 2 rows (partial: details partial (abort_keep_partial_on_error): batch 2 of 3 failed)"
        );
    }

    #[test]
    fn test_both_stages_partial() {
        let r = report(
            Completeness::partial(FailurePolicy::PartialOnError, "page 2"),
            Completeness::partial(FailurePolicy::AbortKeepPartialOnError, "batch 1"),
        );
        let reason = r.partial_reason().unwrap();
        assert!(reason.starts_with("listing"));
        assert!(reason.contains("; details"));
    }
}
