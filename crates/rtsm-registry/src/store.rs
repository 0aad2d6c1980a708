//! # Versioned Record Store
//!
//! An in-memory record map with per-record versions. Mutations run under
//! the map's write lock, so two transitions against the same record are
//! serialized; the optimistic `update_if_version` path lets a caller read
//! a record, release every lock while it waits on an external collaborator,
//! and then commit only if no other writer got there first.
//!
//! Closures receive a copy of the record and the stored value is replaced
//! only on success — a failed transition never leaves a half-mutated
//! record behind.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::RwLock;

use rtsm_core::RtsmError;

#[derive(Debug, Clone)]
struct Versioned<V> {
    version: u64,
    value: V,
}

/// An in-memory record map with per-record compare-and-swap support.
#[derive(Debug)]
pub struct VersionedStore<K, V> {
    records: RwLock<HashMap<K, Versioned<V>>>,
}

impl<K, V> Default for VersionedStore<K, V> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> VersionedStore<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a new record at version 0.
    ///
    /// # Errors
    ///
    /// Returns a conflict if the key already exists.
    pub fn insert(&self, key: K, value: V) -> Result<(), RtsmError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if records.contains_key(&key) {
            return Err(RtsmError::Conflict {
                record: key.to_string(),
                reason: "record already exists".to_string(),
            });
        }
        records.insert(key, Versioned { version: 0, value });
        Ok(())
    }

    /// Read a record and its current version.
    pub fn get(&self, key: &K) -> Option<(V, u64)> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(key).map(|v| (v.value.clone(), v.version))
    }

    /// Whether a record exists.
    pub fn contains(&self, key: &K) -> bool {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.contains_key(key)
    }

    /// Mutate a record under the write lock.
    ///
    /// The closure works on a copy; the stored value is replaced and the
    /// version bumped only if the closure succeeds.
    ///
    /// # Errors
    ///
    /// `NotFound` if the key is absent, otherwise whatever the closure
    /// returns.
    pub fn update<R>(
        &self,
        key: &K,
        f: impl FnOnce(&mut V) -> Result<R, RtsmError>,
    ) -> Result<R, RtsmError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let entry = records.get_mut(key).ok_or_else(|| RtsmError::NotFound {
            record: key.to_string(),
        })?;
        let mut candidate = entry.value.clone();
        let result = f(&mut candidate)?;
        entry.value = candidate;
        entry.version += 1;
        Ok(result)
    }

    /// Mutate a record only if its version still matches `expected`.
    ///
    /// This is the optimistic path for operations that must not hold the
    /// lock while they wait on an external collaborator: read (capturing
    /// the version), wait, then commit here.
    ///
    /// # Errors
    ///
    /// `ConcurrentModification` if another writer bumped the version since
    /// the caller's read; `NotFound` if the key is absent.
    pub fn update_if_version<R>(
        &self,
        key: &K,
        expected: u64,
        f: impl FnOnce(&mut V) -> Result<R, RtsmError>,
    ) -> Result<R, RtsmError> {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        let entry = records.get_mut(key).ok_or_else(|| RtsmError::NotFound {
            record: key.to_string(),
        })?;
        if entry.version != expected {
            return Err(RtsmError::ConcurrentModification {
                record: key.to_string(),
            });
        }
        let mut candidate = entry.value.clone();
        let result = f(&mut candidate)?;
        entry.value = candidate;
        entry.version += 1;
        Ok(result)
    }

    /// Snapshot all record values.
    pub fn snapshot(&self) -> Vec<V> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.values().map(|v| v.value.clone()).collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
