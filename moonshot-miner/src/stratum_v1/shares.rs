//! Outstanding share submissions.
//!
//! Every `mining.submit` gets a fresh request id (starting at
//! [`FIRST_SHARE_ID`]) and is remembered until the pool answers or the
//! connection drops. Ids keep counting across reconnects so a late answer
//! from an old connection can never match a new submission.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::messages::{FIRST_SHARE_ID, error_reason};

/// A submission awaiting the pool's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingShare {
    pub job_id: String,
    pub submitted_at: Instant,
}

/// How the pool answered a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareVerdict {
    Accepted,
    Rejected(String),
}

/// A pool response matched to its submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShare {
    pub job_id: String,
    pub latency: Duration,
    pub verdict: ShareVerdict,
}

/// Assigns submission ids and tracks pending shares.
#[derive(Debug)]
pub struct ShareTracker {
    next_id: u64,
    pending: HashMap<u64, PendingShare>,
}

impl Default for ShareTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ShareTracker {
    pub fn new() -> Self {
        Self {
            next_id: FIRST_SHARE_ID,
            pending: HashMap::new(),
        }
    }

    /// Register a submission and return the request id to send it with.
    pub fn register(&mut self, job_id: &str, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.pending.insert(
            id,
            PendingShare {
                job_id: job_id.to_string(),
                submitted_at: now,
            },
        );
        id
    }

    /// Match a response to a pending share.
    ///
    /// Returns `None` for ids we are not waiting on. Only `result: true`
    /// counts as accepted.
    pub fn resolve(
        &mut self,
        id: u64,
        result: Option<&Value>,
        error: Option<&Value>,
        now: Instant,
    ) -> Option<ResolvedShare> {
        let share = self.pending.remove(&id)?;
        let verdict = if result == Some(&Value::Bool(true)) {
            ShareVerdict::Accepted
        } else {
            ShareVerdict::Rejected(error_reason(error))
        };
        Some(ResolvedShare {
            job_id: share.job_id,
            latency: now.saturating_duration_since(share.submitted_at),
            verdict,
        })
    }

    /// Drop every pending share. Returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_start_at_100_and_increase() {
        let mut tracker = ShareTracker::new();
        let now = Instant::now();
        assert_eq!(tracker.register("a", now), 100);
        assert_eq!(tracker.register("a", now), 101);
        assert_eq!(tracker.register("b", now), 102);
        assert_eq!(tracker.pending_count(), 3);
    }

    #[test]
    fn test_accept() {
        let mut tracker = ShareTracker::new();
        let sent = Instant::now();
        let id = tracker.register("job1", sent);

        let resolved = tracker
            .resolve(id, Some(&json!(true)), None, sent + Duration::from_millis(42))
            .unwrap();
        assert_eq!(resolved.verdict, ShareVerdict::Accepted);
        assert_eq!(resolved.job_id, "job1");
        assert_eq!(resolved.latency, Duration::from_millis(42));
        assert_eq!(tracker.pending_count(), 0);
        assert!(tracker.resolve(id, Some(&json!(true)), None, sent).is_none());
    }

    #[test]
    fn test_reject_reasons() {
        let mut tracker = ShareTracker::new();
        let now = Instant::now();

        let id = tracker.register("job1", now);
        let resolved = tracker
            .resolve(id, None, Some(&json!([23, "Low difficulty share", null])), now)
            .unwrap();
        assert_eq!(
            resolved.verdict,
            ShareVerdict::Rejected("Low difficulty share".to_string())
        );

        let id = tracker.register("job1", now);
        let resolved = tracker.resolve(id, Some(&json!(false)), None, now).unwrap();
        assert_eq!(
            resolved.verdict,
            ShareVerdict::Rejected("Unknown error".to_string())
        );
    }

    #[test]
    fn test_unknown_id_ignored() {
        let mut tracker = ShareTracker::new();
        assert!(
            tracker
                .resolve(100, Some(&json!(true)), None, Instant::now())
                .is_none()
        );
    }

    #[test]
    fn test_clear_drops_pending_and_late_response_is_ignored() {
        let mut tracker = ShareTracker::new();
        let now = Instant::now();
        let id = tracker.register("job1", now);
        tracker.register("job1", now);

        assert_eq!(tracker.clear(), 2);
        assert_eq!(tracker.pending_count(), 0);
        assert!(tracker.resolve(id, Some(&json!(true)), None, now).is_none());

        // Ids are not reused after a clear.
        assert_eq!(tracker.register("job2", now), 102);
    }
}
