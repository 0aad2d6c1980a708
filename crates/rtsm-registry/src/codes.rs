//! # Registration Code Vault
//!
//! Single-use secret codes, each bound to exactly one role. A code admits
//! one registration and is removed on consumption — an attempted reuse is
//! indistinguishable from a code that never existed.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use rtsm_core::{RegistrationCode, Role, RtsmError, Timestamp};

const CODE_LENGTH: usize = 10;

/// A minted registration code, returned to the administrator for
/// distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCode {
    /// The secret code value.
    pub code: RegistrationCode,
    /// The role this code registers.
    pub role: Role,
    /// When the code was issued.
    pub issued_at: Timestamp,
}

/// The registration code vault.
#[derive(Debug, Default)]
pub struct CodeVault {
    codes: Mutex<HashMap<RegistrationCode, IssuedCode>>,
}

impl CodeVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `count` fresh single-use codes for `role`.
    pub fn mint(&self, role: Role, count: u32) -> Vec<IssuedCode> {
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        let mut issued = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let code = loop {
                let candidate = random_code();
                if !codes.contains_key(&candidate) {
                    break candidate;
                }
            };
            let entry = IssuedCode {
                code: code.clone(),
                role,
                issued_at: Timestamp::now(),
            };
            codes.insert(code, entry.clone());
            issued.push(entry);
        }
        issued
    }

    /// Consume a code, returning its bound role.
    ///
    /// # Errors
    ///
    /// Validation for unknown and already-used codes alike — the caller
    /// cannot tell whether a code ever existed.
    pub fn consume(&self, code: &RegistrationCode) -> Result<Role, RtsmError> {
        let mut codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        codes
            .remove(code)
            .map(|issued| issued.role)
            .ok_or_else(|| RtsmError::Validation {
                field: "secret_code".to_string(),
                reason: "invalid or already used".to_string(),
            })
    }

    /// Number of codes not yet consumed.
    pub fn outstanding(&self) -> usize {
        let codes = self.codes.lock().unwrap_or_else(|e| e.into_inner());
        codes.len()
    }
}

fn random_code() -> RegistrationCode {
    // Alphanumeric output is never blank, so construction succeeds on the
    // first pass; the loop keeps the no-panic policy intact regardless.
    loop {
        let value: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CODE_LENGTH)
            .map(char::from)
            .collect();
        if let Ok(code) = RegistrationCode::new(value) {
            return code;
        }
    }
}
