//! # Actor Directory
//!
//! The registered actors and their credentials. This is the single source
//! of truth for who an actor is, what role they hold, and which site they
//! are bound to — every scope resolution goes through one lookup here,
//! never through a fallback chain.
//!
//! Passwords are stored as salted SHA-256 digests. The directory is the
//! reference implementation of the credential-verification contract; a
//! deployment may substitute an external provider behind the same seam.

use std::collections::HashMap;
use std::sync::RwLock;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use rtsm_core::{ActorProfile, Role, RtsmError, SiteCode, Username};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A salted credential digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Credential {
    salt: String,
    digest: String,
}

impl Credential {
    fn derive(password: &str) -> Self {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = hex(&salt_bytes);
        let digest = Self::digest_with_salt(&salt, password);
        Self { salt, digest }
    }

    fn digest_with_salt(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hex(&hasher.finalize())
    }

    fn matches(&self, password: &str) -> bool {
        Self::digest_with_salt(&self.salt, password) == self.digest
    }
}

#[derive(Debug, Clone)]
struct ActorRecord {
    profile: ActorProfile,
    credential: Credential,
}

/// The actor directory.
#[derive(Debug, Default)]
pub struct ActorDirectory {
    actors: RwLock<HashMap<Username, ActorRecord>>,
}

impl ActorDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new actor.
    ///
    /// # Errors
    ///
    /// Conflict if the username is taken; validation if a global-role
    /// actor is given a site.
    pub fn register(
        &self,
        username: Username,
        password: &str,
        role: Role,
        site: Option<SiteCode>,
    ) -> Result<ActorProfile, RtsmError> {
        if site.is_some() && !role.is_site_scoped() {
            return Err(RtsmError::Validation {
                field: "site".to_string(),
                reason: format!("role {role} is global and takes no site assignment"),
            });
        }
        let mut actors = self.actors.write().unwrap_or_else(|e| e.into_inner());
        if actors.contains_key(&username) {
            return Err(RtsmError::Conflict {
                record: username.to_string(),
                reason: "username already exists".to_string(),
            });
        }
        let profile = ActorProfile {
            username: username.clone(),
            role,
            site,
        };
        actors.insert(
            username,
            ActorRecord {
                profile: profile.clone(),
                credential: Credential::derive(password),
            },
        );
        Ok(profile)
    }

    /// Verify credentials and return the stored profile.
    ///
    /// # Errors
    ///
    /// `Authentication` for unknown usernames and wrong passwords alike.
    pub fn verify(&self, username: &str, password: &str) -> Result<ActorProfile, RtsmError> {
        let username = Username::new(username).map_err(|_| RtsmError::Authentication)?;
        let actors = self.actors.read().unwrap_or_else(|e| e.into_inner());
        let record = actors.get(&username).ok_or(RtsmError::Authentication)?;
        if !record.credential.matches(password) {
            return Err(RtsmError::Authentication);
        }
        Ok(record.profile.clone())
    }

    /// Bind an actor to a site, once.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown actors; validation if the role is global or
    /// a site is already assigned — re-assignment is a corrective admin
    /// action, not a lifecycle operation.
    pub fn assign_site(&self, username: &Username, site: SiteCode) -> Result<ActorProfile, RtsmError> {
        let mut actors = self.actors.write().unwrap_or_else(|e| e.into_inner());
        let record = actors.get_mut(username).ok_or_else(|| RtsmError::NotFound {
            record: username.to_string(),
        })?;
        if !record.profile.role.is_site_scoped() {
            return Err(RtsmError::Validation {
                field: "site".to_string(),
                reason: format!("role {} is global and takes no site assignment", record.profile.role),
            });
        }
        if let Some(existing) = &record.profile.site {
            return Err(RtsmError::Validation {
                field: "site".to_string(),
                reason: format!("site already assigned ({existing}); re-assignment is not permitted"),
            });
        }
        record.profile.site = Some(site);
        Ok(record.profile.clone())
    }

    /// Look up a stored profile without verifying credentials.
    pub fn profile(&self, username: &Username) -> Option<ActorProfile> {
        let actors = self.actors.read().unwrap_or_else(|e| e.into_inner());
        actors.get(username).map(|r| r.profile.clone())
    }

    /// Number of registered actors.
    pub fn len(&self) -> usize {
        let actors = self.actors.read().unwrap_or_else(|e| e.into_inner());
        actors.len()
    }

    /// Whether no actor is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
