//! In-memory record store with per-record locks and version-guarded updates.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use uuid::Uuid;
use worksbill_domain::{ApprovalRequest, Execution, RaBill};

use crate::CoreError;

/// Records that carry an optimistic version counter.
pub trait Versioned: Clone + Send {
    const KIND: &'static str;

    fn record_id(&self) -> Uuid;
    fn version(&self) -> u64;
    fn bump_version(&mut self);
}

impl Versioned for Execution {
    const KIND: &'static str = "execution";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl Versioned for RaBill {
    const KIND: &'static str = "bill";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}

impl Versioned for ApprovalRequest {
    const KIND: &'static str = "approval request";

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn bump_version(&mut self) {
        self.version += 1;
    }
}

/// The map lock is only held to look up or insert a slot; updates lock the single record.
pub struct Registry<T: Versioned> {
    records: RwLock<HashMap<Uuid, Arc<Mutex<T>>>>,
}

impl<T: Versioned> Default for Registry<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Versioned> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: T) -> Result<(), CoreError> {
        let id = record.record_id();
        let mut records = self
            .records
            .write()
            .map_err(|_| CoreError::poisoned(T::KIND))?;
        if records.contains_key(&id) {
            return Err(CoreError::Validation(format!(
                "{} {} already exists",
                T::KIND,
                id
            )));
        }
        records.insert(id, Arc::new(Mutex::new(record)));
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<T, CoreError> {
        let slot = self.slot(id)?;
        let record = slot.lock().map_err(|_| CoreError::poisoned(T::KIND))?;
        Ok(record.clone())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records
            .read()
            .map(|records| records.contains_key(&id))
            .unwrap_or(false)
    }

    pub fn list(&self) -> Result<Vec<T>, CoreError> {
        let slots: Vec<Arc<Mutex<T>>> = self
            .records
            .read()
            .map_err(|_| CoreError::poisoned(T::KIND))?
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .map(|slot| {
                slot.lock()
                    .map(|record| record.clone())
                    .map_err(|_| CoreError::poisoned(T::KIND))
            })
            .collect()
    }

    /// Applies `mutate` only if the stored version still equals `expected_version`.
    ///
    /// A version mismatch means another caller committed first and yields `Conflict`.
    /// If `mutate` fails the stored record is left untouched.
    pub fn compare_and_update<F>(
        &self,
        id: Uuid,
        expected_version: u64,
        mutate: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(&mut T) -> Result<(), CoreError>,
    {
        let slot = self.slot(id)?;
        let mut record = slot.lock().map_err(|_| CoreError::poisoned(T::KIND))?;
        if record.version() != expected_version {
            return Err(CoreError::Conflict(format!(
                "{} {} was modified concurrently (expected version {}, found {})",
                T::KIND,
                id,
                expected_version,
                record.version()
            )));
        }
        let mut next = record.clone();
        mutate(&mut next)?;
        next.bump_version();
        *record = next.clone();
        Ok(next)
    }

    /// Removes the record if its version is unchanged and `allowed` accepts it.
    pub fn remove_if<P>(&self, id: Uuid, expected_version: u64, allowed: P) -> Result<T, CoreError>
    where
        P: FnOnce(&T) -> Result<(), CoreError>,
    {
        let mut records = self
            .records
            .write()
            .map_err(|_| CoreError::poisoned(T::KIND))?;
        let slot = records
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(T::KIND, id))?;
        let record = slot.lock().map_err(|_| CoreError::poisoned(T::KIND))?;
        if record.version() != expected_version {
            return Err(CoreError::Conflict(format!(
                "{} {} was modified concurrently",
                T::KIND,
                id
            )));
        }
        allowed(&record)?;
        let removed = record.clone();
        drop(record);
        records.remove(&id);
        Ok(removed)
    }

    fn slot(&self, id: Uuid) -> Result<Arc<Mutex<T>>, CoreError> {
        self.records
            .read()
            .map_err(|_| CoreError::poisoned(T::KIND))?
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(T::KIND, id))
    }
}
