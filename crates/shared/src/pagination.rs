//! Limit handling for list endpoints.

/// Default number of records returned when no limit is given.
pub const DEFAULT_LIMIT: i64 = 50;

/// Upper bound on the number of records a single list call may return.
pub const MAX_LIMIT: i64 = 500;

/// Normalizes a caller-supplied limit into `[1, MAX_LIMIT]`.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
