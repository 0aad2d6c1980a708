//! # Service Policy Configuration
//!
//! Whether a non-`Active` site blocks new enrollments or consignments is
//! deployment policy, not a hard invariant — the gates default to off and
//! a sponsor turns them on per study.

use serde::{Deserialize, Serialize};

/// Site-activation gating policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SitePolicy {
    /// Reject enrollment when the participant's site is not `Active`.
    pub require_active_site_for_enrollment: bool,
    /// Reject consignments destined for a site that is not `Active`.
    pub require_active_site_for_consignment: bool,
}
