//! # Site Registry
//!
//! Site definitions, keyed by code. `define` is create-or-update; there is
//! no removal operation. A site referenced by a participant or consignment
//! stays on the books forever, and status toggles are the only way to take
//! it out of service.

use std::collections::HashMap;
use std::sync::RwLock;

use rtsm_core::{Site, SiteCode};

/// The site registry.
#[derive(Debug, Default)]
pub struct SiteRegistry {
    sites: RwLock<HashMap<SiteCode, Site>>,
}

impl SiteRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update a site definition, returning the stored value.
    pub fn define(&self, site: Site) -> Site {
        let mut sites = self.sites.write().unwrap_or_else(|e| e.into_inner());
        sites.insert(site.code.clone(), site.clone());
        site
    }

    /// Read a site definition.
    pub fn get(&self, code: &SiteCode) -> Option<Site> {
        let sites = self.sites.read().unwrap_or_else(|e| e.into_inner());
        sites.get(code).cloned()
    }

    /// Whether a site with this code is defined.
    pub fn exists(&self, code: &SiteCode) -> bool {
        let sites = self.sites.read().unwrap_or_else(|e| e.into_inner());
        sites.contains_key(code)
    }

    /// Whether the site is defined and `Active`.
    pub fn is_active(&self, code: &SiteCode) -> bool {
        self.get(code).map(|s| s.is_active()).unwrap_or(false)
    }

    /// All site definitions, ordered by code.
    pub fn list(&self) -> Vec<Site> {
        let sites = self.sites.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<Site> = sites.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        all
    }

    /// Number of defined sites.
    pub fn len(&self) -> usize {
        let sites = self.sites.read().unwrap_or_else(|e| e.into_inner());
        sites.len()
    }

    /// Whether no site is defined.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
