//! Webhook delivery model.
//!
//! A delivery is the obligation to deliver one event to one webhook and may
//! span several attempts. Attempts are numbered from 1 and never exceed
//! `max_attempts`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Attempt budget for regular deliveries.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Attempt budget for "test webhook" deliveries.
pub const TEST_MAX_ATTEMPTS: u32 = 1;

/// Delay before the retry that will run as attempt number `attempt`.
///
/// `2^attempt` minutes: attempt 2 waits 4 minutes, attempt 3 waits 8, and so on.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::minutes(2i64.saturating_pow(attempt))
}

/// Delivery lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
    ScheduledRetry,
    DeadLettered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::ScheduledRetry => "scheduled_retry",
            DeliveryStatus::DeadLettered => "dead_lettered",
        }
    }

    /// Whether no further attempt can ever happen from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Success | DeliveryStatus::Failed | DeliveryStatus::DeadLettered
        )
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "success" => Ok(DeliveryStatus::Success),
            "failed" => Ok(DeliveryStatus::Failed),
            "scheduled_retry" => Ok(DeliveryStatus::ScheduledRetry),
            "dead_lettered" => Ok(DeliveryStatus::DeadLettered),
            other => Err(format!("unknown delivery status: {}", other)),
        }
    }
}

/// One logical delivery of one event to one webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Delivery {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_id: Uuid,
    pub attempt: u32,
    pub max_attempts: u32,
    pub status: DeliveryStatus,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Creates a pending delivery at attempt 1.
    ///
    /// A zero budget is raised to 1 so that `attempt <= max_attempts` holds.
    pub fn new(webhook_id: Uuid, event_id: Uuid, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            webhook_id,
            event_id,
            attempt: 1,
            max_attempts: max_attempts.max(1),
            status: DeliveryStatus::Pending,
            next_retry_at: None,
            status_code: None,
            error_message: None,
            last_attempt_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a failed current attempt may still be followed by another one.
    pub fn has_attempts_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Records the result of the current attempt without changing status.
    pub fn record_attempt(
        &mut self,
        status_code: Option<u16>,
        error: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.status_code = status_code;
        self.error_message = error;
        self.last_attempt_at = Some(at);
        self.updated_at = at;
    }

    pub fn mark_success(&mut self, at: DateTime<Utc>) {
        self.status = DeliveryStatus::Success;
        self.next_retry_at = None;
        self.completed_at = Some(at);
        self.updated_at = at;
    }

    /// Ends the delivery as failed without retrying or dead-lettering.
    pub fn mark_failed(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        self.status = DeliveryStatus::Failed;
        self.error_message = Some(reason.into());
        self.next_retry_at = None;
        self.completed_at = Some(at);
        self.updated_at = at;
    }

    /// Advances to the next attempt and schedules it with exponential backoff.
    ///
    /// Returns `None` (and changes nothing) when the attempt budget is spent.
    pub fn schedule_retry(&mut self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.has_attempts_remaining() {
            return None;
        }
        self.attempt += 1;
        let next = now + backoff_delay(self.attempt);
        self.status = DeliveryStatus::ScheduledRetry;
        self.next_retry_at = Some(next);
        self.updated_at = now;
        Some(next)
    }

    pub fn mark_dead_lettered(&mut self, at: DateTime<Utc>) {
        self.status = DeliveryStatus::DeadLettered;
        self.next_retry_at = None;
        self.completed_at = Some(at);
        self.updated_at = at;
    }

    /// Moves a claimed retry back to pending right before it fires.
    pub fn mark_pending(&mut self, at: DateTime<Utc>) {
        self.status = DeliveryStatus::Pending;
        self.next_retry_at = None;
        self.updated_at = at;
    }

    /// Puts a claimed retry back in `scheduled_retry` for `due` without
    /// spending another attempt.
    pub fn requeue(&mut self, due: DateTime<Utc>, at: DateTime<Utc>) {
        self.status = DeliveryStatus::ScheduledRetry;
        self.next_retry_at = Some(due);
        self.updated_at = at;
    }
}

/// Result of one HTTP delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The endpoint answered with a 2xx status.
    Success { status_code: u16 },
    /// Non-2xx response, timeout or connection error. Retried.
    TransientFailure {
        status_code: Option<u16>,
        reason: String,
    },
    /// The request could not be issued at all. Never retried.
    PermanentFailure { reason: String },
}

impl DeliveryOutcome {
    /// Classifies an HTTP response status.
    pub fn from_status(status_code: u16) -> Self {
        if (200..300).contains(&status_code) {
            DeliveryOutcome::Success { status_code }
        } else {
            DeliveryOutcome::TransientFailure {
                status_code: Some(status_code),
                reason: format!("HTTP {}", status_code),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            DeliveryOutcome::Success { status_code } => Some(*status_code),
            DeliveryOutcome::TransientFailure { status_code, .. } => *status_code,
            DeliveryOutcome::PermanentFailure { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            DeliveryOutcome::Success { .. } => None,
            DeliveryOutcome::TransientFailure { reason, .. }
            | DeliveryOutcome::PermanentFailure { reason } => Some(reason),
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Success { .. } => "success",
            DeliveryOutcome::TransientFailure { .. } => "transient_failure",
            DeliveryOutcome::PermanentFailure { .. } => "permanent_failure",
        }
    }
}
