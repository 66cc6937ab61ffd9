//! Fetch outcomes for the two remote stages.
//!
//! Listing and detail lookups never fail a run. They stop early and hand
//! back what they collected, tagged with how they stopped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a remote stage reacts to a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop walking pages and keep everything accumulated so far.
    PartialOnError,
    /// Skip every remaining batch and keep rows from completed batches.
    AbortKeepPartialOnError,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartialOnError => "partial_on_error",
            Self::AbortKeepPartialOnError => "abort_keep_partial_on_error",
        }
    }
}

/// Whether a stage saw every page or batch it set out to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completeness {
    Complete,
    Partial {
        policy: FailurePolicy,
        reason: String,
    },
}

impl Completeness {
    pub fn partial(policy: FailurePolicy, reason: impl Into<String>) -> Self {
        Self::Partial {
            policy,
            reason: reason.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for Completeness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial { policy, reason } => {
                write!(f, "partial ({}): {}", policy.as_str(), reason)
            }
        }
    }
}

/// Items collected by a remote stage plus how the stage ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome<T> {
    pub items: Vec<T>,
    pub completeness: Completeness,
}

impl<T> FetchOutcome<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            completeness: Completeness::Complete,
        }
    }

    pub fn partial(items: Vec<T>, policy: FailurePolicy, reason: impl Into<String>) -> Self {
        Self {
            items,
            completeness: Completeness::partial(policy, reason),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completeness.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completeness_display() {
        assert_eq!(Completeness::Complete.to_string(), "complete");
        let partial = Completeness::partial(FailurePolicy::PartialOnError, "status 502 on page 3");
        assert_eq!(
            partial.to_string(),
            "partial (partial_on_error): status 502 on page 3"
        );
        assert!(!partial.is_complete());
    }

    #[test]
    fn test_fetch_outcome_keeps_items_when_partial() {
        let outcome = FetchOutcome::partial(vec![1, 2], FailurePolicy::AbortKeepPartialOnError, "x");
        assert_eq!(outcome.items, vec![1, 2]);
        assert!(!outcome.is_complete());
    }
}
