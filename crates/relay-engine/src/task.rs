//! Task records and lifecycle management.
//!
//! This module provides:
//! - `TaskStatus`: The state machine for notification delivery
//! - `HttpMethod`: The accepted outbound methods
//! - `NotificationTask`: The durable record for a single notification
//!
//! ## State machine
//!
//! ```text
//!            insert
//!               │
//!               ▼
//!         ┌──────────┐
//!         │ PENDING  │◄──────────────────────┐
//!         └────┬─────┘                       │ retry scheduled
//!              │ CAS(PENDING→PROCESSING)     │ (budget left)
//!              ▼                             │
//!         ┌────────────┐                     │
//!         │ PROCESSING ├─────────────────────┘
//!         └─────┬──────┘
//!               │
//!      ┌────────┴────────┐
//!      ▼                 ▼
//!   SUCCESS           FAILED ──(manual retry)──► PENDING
//! ```
//!
//! The recovery sweeper may also force PROCESSING back to PENDING when a
//! worker dies mid-attempt; that reset is idempotent.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relay_core::TaskId;

/// Delivery state of a notification task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Waiting to be dispatched (fresh, rescheduled, or recovered).
    Pending,
    /// Claimed by exactly one worker; an attempt is in flight.
    Processing,
    /// Delivered: the target answered with a 2xx.
    Success,
    /// Terminally failed: non-retryable response or budget exhausted.
    Failed,
}

impl TaskStatus {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    /// Returns true if the transition from self to target is valid.
    ///
    /// `Processing -> Pending` covers both the reschedule-after-retryable
    /// path and the sweeper's forced reset of abandoned claims.
    /// `Failed -> Pending` is the manual-retry path.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        match self {
            Self::Pending => matches!(target, Self::Processing),
            Self::Processing => matches!(target, Self::Success | Self::Failed | Self::Pending),
            Self::Failed => matches!(target, Self::Pending),
            Self::Success => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outbound HTTP method for a notification.
///
/// Only mutating methods are accepted; the relay never issues GETs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// HTTP POST (the default).
    #[default]
    Post,
    /// HTTP PUT.
    Put,
    /// HTTP PATCH.
    Patch,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}

/// Default retry budget when the caller does not specify one.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// The durable record for a single notification-delivery job.
///
/// `headers` and `body` are opaque caller-supplied structures stored and
/// forwarded verbatim; the relay never interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTask {
    /// Globally unique, opaque identifier. Primary external handle.
    pub task_id: TaskId,
    /// Free-form originator tag (1..100 chars). Informational.
    pub source_system: String,
    /// Absolute HTTP/HTTPS URL of the target endpoint.
    pub target_url: String,
    /// Outbound HTTP method.
    pub http_method: HttpMethod,
    /// Caller-supplied request headers (single value per name).
    pub headers: BTreeMap<String, String>,
    /// Caller-supplied payload, serialized as JSON on the wire.
    pub body: serde_json::Value,
    /// Current delivery state.
    pub status: TaskStatus,
    /// Number of attempts completed (not including one in flight).
    pub retry_count: u32,
    /// Total allowed attempts beyond the first, in `[1, 10]`.
    pub max_retries: u32,
    /// Earliest instant the task is eligible for another dispatch.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Last observed HTTP status (None if only network errors occurred).
    pub last_http_status: Option<u16>,
    /// Last failure description.
    pub last_error: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the durable record was last written.
    pub updated_at: DateTime<Utc>,
    /// When the task reached SUCCESS or FAILED.
    pub completed_at: Option<DateTime<Utc>>,
}

impl NotificationTask {
    /// Creates a fresh PENDING record.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        task_id: TaskId,
        source_system: impl Into<String>,
        target_url: impl Into<String>,
        http_method: HttpMethod,
        headers: BTreeMap<String, String>,
        body: serde_json::Value,
        max_retries: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            source_system: source_system.into(),
            target_url: target_url.into(),
            http_method,
            headers,
            body,
            status: TaskStatus::Pending,
            retry_count: 0,
            max_retries,
            next_retry_at: None,
            last_http_status: None,
            last_error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Returns true if the retry budget is not yet exhausted.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Returns true if the task may be dispatched at `now`.
    #[must_use]
    pub fn is_dispatchable(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.next_retry_at.is_none_or(|at| at <= now)
    }

    /// Returns true if the task is an abandoned in-flight claim.
    ///
    /// `threshold` is the oldest acceptable `updated_at` for a live claim.
    #[must_use]
    pub fn is_stuck(&self, threshold: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Processing && self.updated_at < threshold
    }

    /// Computes the backoff delay for the current (post-increment) retry
    /// count.
    ///
    /// The delay doubles per attempt: `base * 2^(retry_count - 1)`, so a
    /// 2-second base yields 2s, 4s, 8s, 16s, 32s.
    #[must_use]
    pub fn backoff_delay(&self, base: Duration) -> Duration {
        let exponent = self.retry_count.saturating_sub(1).min(20);
        base.saturating_mul(1 << exponent)
    }

    /// Resets a FAILED record for manual re-delivery.
    ///
    /// The last error and HTTP status are preserved for diagnostics; the
    /// caller is responsible for CAS-gating the transition.
    pub fn reset_for_manual_retry(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Pending;
        self.retry_count = 0;
        self.next_retry_at = None;
        self.completed_at = None;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> NotificationTask {
        NotificationTask::create(
            TaskId::generate(),
            "order-service",
            "https://partner.example.com/hooks",
            HttpMethod::Post,
            BTreeMap::new(),
            serde_json::json!({"orderId": 42}),
            DEFAULT_MAX_RETRIES,
            Utc::now(),
        )
    }

    #[test]
    fn fresh_task_is_pending_with_zero_retries() {
        let task = sample_task();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 0);
        assert!(task.next_retry_at.is_none());
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn status_transitions() {
        use TaskStatus::{Failed, Pending, Processing, Success};

        assert!(Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Success));
        assert!(Processing.can_transition_to(Success));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Pending));
        assert!(Failed.can_transition_to(Pending));
        assert!(!Failed.can_transition_to(Processing));
        assert!(!Success.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&TaskStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");
        let back: TaskStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(back, TaskStatus::Failed);
    }

    #[test]
    fn method_defaults_to_post() {
        assert_eq!(HttpMethod::default(), HttpMethod::Post);
        let parsed: HttpMethod = serde_json::from_str("\"PATCH\"").unwrap();
        assert_eq!(parsed, HttpMethod::Patch);
    }

    #[test]
    fn backoff_schedule_doubles_from_base() {
        let mut task = sample_task();
        let base = Duration::from_secs(2);

        let expected = [2u64, 4, 8, 16, 32];
        for (attempt, secs) in expected.iter().enumerate() {
            task.retry_count = u32::try_from(attempt).unwrap() + 1;
            assert_eq!(task.backoff_delay(base), Duration::from_secs(*secs));
        }
    }

    #[test]
    fn backoff_exponent_is_clamped() {
        let mut task = sample_task();
        task.retry_count = u32::MAX;
        // Must not overflow, only grow monotonically to the clamp.
        let delay = task.backoff_delay(Duration::from_secs(2));
        assert_eq!(delay, Duration::from_secs(2) * (1 << 20));
    }

    #[test]
    fn dispatchable_respects_backoff_window() {
        let now = Utc::now();
        let mut task = sample_task();
        assert!(task.is_dispatchable(now));

        task.next_retry_at = Some(now + chrono::Duration::seconds(30));
        assert!(!task.is_dispatchable(now));

        task.next_retry_at = Some(now - chrono::Duration::seconds(1));
        assert!(task.is_dispatchable(now));

        task.status = TaskStatus::Processing;
        assert!(!task.is_dispatchable(now));
    }

    #[test]
    fn stuck_detection_uses_updated_at() {
        let now = Utc::now();
        let mut task = sample_task();
        task.status = TaskStatus::Processing;
        task.updated_at = now - chrono::Duration::minutes(10);

        let threshold = now - chrono::Duration::minutes(5);
        assert!(task.is_stuck(threshold));

        task.updated_at = now;
        assert!(!task.is_stuck(threshold));
    }

    #[test]
    fn manual_retry_resets_progress_but_keeps_diagnostics() {
        let now = Utc::now();
        let mut task = sample_task();
        task.status = TaskStatus::Failed;
        task.retry_count = 3;
        task.next_retry_at = Some(now);
        task.completed_at = Some(now);
        task.last_error = Some("HTTP 500".into());
        task.last_http_status = Some(500);

        task.reset_for_manual_retry(now);

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 0);
        assert!(task.next_retry_at.is_none());
        assert!(task.completed_at.is_none());
        assert_eq!(task.last_error.as_deref(), Some("HTTP 500"));
        assert_eq!(task.last_http_status, Some(500));
    }
}
