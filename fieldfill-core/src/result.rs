//! Run outcome accounting

use serde::Serialize;
use std::fmt;

/// Why a candidate record was not updated
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Partition key absent or empty; the record was not attempted
    MissingPartitionKey,
    /// Sort key absent or empty; the record was not attempted
    MissingSortKey,
    /// Source attribute absent; the record was not attempted
    MissingSourceField,
    /// The store rejected the update
    UpdateFailed(String),
}

impl FailureReason {
    /// Whether the record was skipped without issuing an update
    pub fn is_skip(&self) -> bool {
        !matches!(self, FailureReason::UpdateFailed(_))
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingPartitionKey => f.write_str("skipped: missing partition key"),
            FailureReason::MissingSortKey => f.write_str("skipped: missing sort key"),
            FailureReason::MissingSourceField => f.write_str("skipped: missing source field"),
            FailureReason::UpdateFailed(msg) => write!(f, "update failed: {msg}"),
        }
    }
}

/// One failed candidate
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Human-readable key (`pk=value, sk=value`)
    pub key: String,
    pub reason: FailureReason,
}

/// Aggregate outcome of a backfill run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BackfillResult {
    /// Candidates returned by the scan
    pub matched: usize,
    /// Successful updates
    pub updated: usize,
    /// Skipped or failed candidates
    pub failed: usize,
    /// Details for every entry counted in `failed`
    pub failures: Vec<Failure>,
    /// Set when the run issued no writes
    pub dry_run: bool,
}

impl BackfillResult {
    /// A run with no failures
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    pub(crate) fn record_success(&mut self) {
        self.updated += 1;
    }

    pub(crate) fn record_failure(&mut self, key: String, reason: FailureReason) {
        self.failed += 1;
        self.failures.push(Failure { key, reason });
    }
}

/// Progress signal surfaced to the caller during the update phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Successful updates so far
    pub updated: usize,
    /// Candidates known so far
    pub total: usize,
    /// Whether `total` is final (always true under the collect strategy)
    pub scan_complete: bool,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scan_complete {
            write!(f, "{}/{} processed", self.updated, self.total)
        } else {
            write!(f, "{}/{}+ processed", self.updated, self.total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_accounting() {
        let mut result = BackfillResult::default();
        assert!(result.is_clean());

        result.record_success();
        result.record_failure("k".into(), FailureReason::MissingSortKey);
        assert_eq!(result.updated, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failures.len(), 1);
        assert!(!result.is_clean());
        assert!(result.failures[0].reason.is_skip());
        assert!(!FailureReason::UpdateFailed("x".into()).is_skip());
    }

    #[test]
    fn progress_display() {
        let p = Progress {
            updated: 10,
            total: 42,
            scan_complete: true,
        };
        assert_eq!(p.to_string(), "10/42 processed");
        let p = Progress {
            scan_complete: false,
            ..p
        };
        assert_eq!(p.to_string(), "10/42+ processed");
    }

    #[test]
    fn serializes_reasons_with_kind_tag() {
        let failure = Failure {
            key: "session_id=a, timestamp=1".into(),
            reason: FailureReason::UpdateFailed("throttled".into()),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["reason"]["kind"], "update_failed");
        assert_eq!(json["reason"]["detail"], "throttled");

        let json = serde_json::to_value(FailureReason::MissingSortKey).unwrap();
        assert_eq!(json["kind"], "missing_sort_key");
    }
}
