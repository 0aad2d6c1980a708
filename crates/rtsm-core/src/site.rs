//! # Site Model
//!
//! A trial site definition: unique code, display name, activation status,
//! and activation date. Sites are provisioned by the Administrator and are
//! never deleted once a participant or consignment references them —
//! status toggles are the only mutation after that point.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::RtsmError;
use crate::identity::SiteCode;
use crate::temporal::TrialDate;

/// Activation status of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    /// Site is open for enrollment and supply.
    Active,
    /// Site is closed; kept for referential integrity.
    Inactive,
    /// Site is defined but not yet activated.
    Pending,
}

impl SiteStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Pending => "PENDING",
        }
    }
}

impl FromStr for SiteStatus {
    type Err = RtsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "pending" => Ok(Self::Pending),
            other => Err(RtsmError::Validation {
                field: "activation_status".to_string(),
                reason: format!("unknown site status {other:?}"),
            }),
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trial site definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Unique site code.
    pub code: SiteCode,
    /// Human-readable site name.
    pub name: String,
    /// Activation status.
    pub status: SiteStatus,
    /// Date the site was (or will be) activated.
    pub activation_date: TrialDate,
}

impl Site {
    /// Whether the site currently accepts new work under an
    /// active-site-required policy.
    pub fn is_active(&self) -> bool {
        matches!(self.status, SiteStatus::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_site(status: SiteStatus) -> Site {
        Site {
            code: SiteCode::new("SITEA").unwrap(),
            name: "Metropolitan General".to_string(),
            status,
            activation_date: TrialDate::parse("2026-01-01").unwrap(),
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(SiteStatus::from_str("Active").unwrap(), SiteStatus::Active);
        assert_eq!(
            SiteStatus::from_str(" PENDING ").unwrap(),
            SiteStatus::Pending
        );
        assert!(SiteStatus::from_str("open").is_err());
    }

    #[test]
    fn test_only_active_sites_report_active() {
        assert!(make_site(SiteStatus::Active).is_active());
        assert!(!make_site(SiteStatus::Inactive).is_active());
        assert!(!make_site(SiteStatus::Pending).is_active());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SiteStatus::Active.to_string(), "ACTIVE");
        assert_eq!(SiteStatus::Pending.to_string(), "PENDING");
    }

    #[test]
    fn test_site_serde_roundtrip() {
        let site = make_site(SiteStatus::Active);
        let json = serde_json::to_string(&site).unwrap();
        let parsed: Site = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, site);
    }
}
