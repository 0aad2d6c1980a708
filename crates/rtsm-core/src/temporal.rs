//! # Temporal Types
//!
//! Defines `Timestamp`, a UTC-only timestamp with seconds precision used
//! for audit ordering, and `TrialDate`, a plain calendar date for the
//! clinical fields (enrollment, consent, birth, screen-failure, completion,
//! code-break dates) that carry no time-of-day component.
//!
//! ## Invariant
//!
//! Timestamps are UTC with no sub-second component. Non-UTC inputs are
//! rejected at construction — there is no silent conversion that could
//! reorder two ledger entries recorded in different local zones.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RtsmError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an ISO8601 string, rejecting non-UTC offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 / ISO8601 string.
    ///
    /// **Rejects non-UTC inputs.** Only the `Z` suffix is accepted; explicit
    /// offsets are rejected even when semantically equivalent (`+00:00`).
    ///
    /// # Errors
    ///
    /// Returns a validation error if the string is not valid RFC 3339 or
    /// uses a non-Z timezone offset.
    pub fn parse(s: &str) -> Result<Self, RtsmError> {
        if !s.ends_with('Z') {
            return Err(RtsmError::Validation {
                field: "timestamp".to_string(),
                reason: format!("must use Z suffix (UTC only), got {s:?}"),
            });
        }

        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| RtsmError::Validation {
            field: "timestamp".to_string(),
            reason: format!("invalid RFC 3339 timestamp {s:?}: {e}"),
        })?;

        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// A calendar date (`YYYY-MM-DD`) with no time-of-day component.
///
/// Clinical dates are captured as entered on the source worksheet; they are
/// compared and ordered as dates, never converted through a timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialDate(NaiveDate);

impl TrialDate {
    /// Parse a date from `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field format.
    pub fn parse(s: &str) -> Result<Self, RtsmError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| RtsmError::Validation {
                field: "date".to_string(),
                reason: format!("invalid date {s:?} (expected YYYY-MM-DD): {e}"),
            })
    }

    /// Wrap a `chrono::NaiveDate`.
    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Access the inner `NaiveDate`.
    pub fn as_naive(&self) -> &NaiveDate {
        &self.0
    }
}

impl std::fmt::Display for TrialDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
