//! # Identity & Scope Resolver
//!
//! Resolves submitted credentials to `{role, scope}`. Resolution is
//! stateless and happens once per operation — the resulting [`Identity`]
//! is passed explicitly to every service call, replacing any notion of a
//! process-wide "current user".
//!
//! The [`CredentialVerifier`] trait is the seam to the authentication
//! provider; the in-process actor directory implements it, and a
//! deployment may substitute an external provider without touching the
//! service layer.

use serde::{Deserialize, Serialize};

use rtsm_core::{ActorProfile, Role, RtsmError, Scope, Username};
use rtsm_registry::ActorDirectory;

/// Submitted credentials, as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Login name.
    pub username: String,
    /// Clear-text password (verified, never stored).
    pub password: String,
}

/// The authentication provider contract.
///
/// Returns the stored actor profile on success; unknown usernames and
/// wrong passwords fail identically.
pub trait CredentialVerifier: Send + Sync {
    /// Verify credentials and return the stored profile.
    fn verify(&self, username: &str, password: &str) -> Result<ActorProfile, RtsmError>;
}

impl CredentialVerifier for ActorDirectory {
    fn verify(&self, username: &str, password: &str) -> Result<ActorProfile, RtsmError> {
        ActorDirectory::verify(self, username, password)
    }
}

/// A resolved actor identity: who, which role, which scope.
///
/// Carried explicitly by every operation; never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The authenticated actor.
    pub username: Username,
    /// The actor's role.
    pub role: Role,
    /// The boundary the actor operates within.
    pub scope: Scope,
}

impl Identity {
    /// Derive an identity from a verified profile.
    ///
    /// Site-scoped roles resolve to `Scope::Site`; global roles to
    /// `Scope::Global`.
    ///
    /// # Errors
    ///
    /// Validation if a site-scoped actor has no site assigned yet — such
    /// an actor must be bound via `assign_site` before operating.
    pub fn from_profile(profile: ActorProfile) -> Result<Self, RtsmError> {
        let scope = if profile.role.is_site_scoped() {
            match profile.site {
                Some(site) => Scope::Site(site),
                None => {
                    return Err(RtsmError::Validation {
                        field: "site".to_string(),
                        reason: format!(
                            "actor {} has no site assigned yet",
                            profile.username
                        ),
                    })
                }
            }
        } else {
            Scope::Global
        };
        Ok(Self {
            username: profile.username,
            role: profile.role,
            scope,
        })
    }
}

/// Resolve credentials to an identity. Read-only; no side effects.
///
/// # Errors
///
/// `Authentication` on invalid credentials; validation if the actor is
/// not yet bound to a site.
pub fn resolve(
    verifier: &dyn CredentialVerifier,
    credentials: &Credentials,
) -> Result<Identity, RtsmError> {
    let profile = verifier.verify(&credentials.username, &credentials.password)?;
    Identity::from_profile(profile)
}
