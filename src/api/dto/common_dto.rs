//! Shared DTO helpers used across multiple endpoints.

/// Default number of rows returned by list endpoints.
pub const DEFAULT_LIMIT: i64 = 50;

/// Upper bound on `limit` for list endpoints.
pub const MAX_LIMIT: i64 = 200;

/// Applies the list default and clamps to `1..=MAX_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
