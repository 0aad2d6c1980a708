//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in the RTSM Stack.
//! These prevent accidental identifier confusion — you cannot pass a
//! `PackId` where a `ParticipantId` is expected, and a consignment
//! identifier can never be mistaken for the pack it carries.
//!
//! Sequence-derived identifiers (`ParticipantId`, `ConsignmentId`,
//! `ScreeningNumber`) are minted by the registries; free-form identifiers
//! (`PackId`, `SiteCode`, `Username`) are validated at construction so a
//! blank or whitespace-only value cannot enter the system.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RtsmError;

/// Unique identifier for an enrolled participant (`PAT001`, `PAT002`, …).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(String);

/// Site-derived screening label for a participant (`SITEA001`-style).
///
/// Distinct from [`ParticipantId`]: the screening number is scoped to a
/// site and printed on site-facing worksheets; the participant id is
/// global.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreeningNumber(String);

/// Identifier of a physically distinct drug-supply unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackId(String);

/// Unique identifier for a depot→site consignment (`CON-001`, …).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsignmentId(String);

/// Short unique code naming a trial site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteCode(String);

/// Unique actor login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Username(String);

/// Single-use secret code that gates actor registration for one role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistrationCode(String);

/// Unique identifier for a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

/// Validate a free-form identifier: trimmed, non-empty.
fn validated(field: &'static str, raw: impl Into<String>) -> Result<String, RtsmError> {
    let value = raw.into().trim().to_string();
    if value.is_empty() {
        return Err(RtsmError::Validation {
            field: field.to_string(),
            reason: "must not be blank".to_string(),
        });
    }
    Ok(value)
}

impl ParticipantId {
    /// Mint the identifier for the given global enrollment sequence number.
    pub fn from_sequence(seq: u32) -> Self {
        Self(format!("PAT{seq:03}"))
    }

    /// Accept an externally supplied identifier (lookups, API paths).
    pub fn new(raw: impl Into<String>) -> Result<Self, RtsmError> {
        Ok(Self(validated("participant_id", raw)?))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ScreeningNumber {
    /// Mint the screening number for a site's per-site enrollment sequence.
    pub fn from_sequence(site: &SiteCode, seq: u32) -> Self {
        Self(format!("{}{seq:03}", site.as_str()))
    }

    /// The label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PackId {
    /// Construct a pack identifier from external input.
    pub fn new(raw: impl Into<String>) -> Result<Self, RtsmError> {
        Ok(Self(validated("pack_id", raw)?))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ConsignmentId {
    /// Mint the identifier for the given consignment sequence number.
    pub fn from_sequence(seq: u32) -> Self {
        Self(format!("CON-{seq:03}"))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SiteCode {
    /// Construct a site code from external input.
    pub fn new(raw: impl Into<String>) -> Result<Self, RtsmError> {
        Ok(Self(validated("site", raw)?))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Username {
    /// Construct a username from external input.
    pub fn new(raw: impl Into<String>) -> Result<Self, RtsmError> {
        Ok(Self(validated("username", raw)?))
    }

    /// The username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RegistrationCode {
    /// Wrap an already-minted code value.
    pub fn new(raw: impl Into<String>) -> Result<Self, RtsmError> {
        Ok(Self(validated("secret_code", raw)?))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EventId {
    /// Generate a new random event identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ScreeningNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for PackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ConsignmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for SiteCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event:{}", self.0)
    }
}
