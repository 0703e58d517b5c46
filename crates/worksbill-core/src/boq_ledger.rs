//! Authoritative sanctioned and verified quantities per BOQ item.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use rust_decimal::Decimal;
use uuid::Uuid;
use worksbill_domain::{BoqItem, LedgerBalance, LedgerUpdate};

use crate::CoreError;

struct LedgerRow {
    item: BoqItem,
    verified: Decimal,
}

/// Running verified totals, one mutex per item so increments never lose updates.
#[derive(Default)]
pub struct BoqLedger {
    rows: RwLock<HashMap<Uuid, Arc<Mutex<LedgerRow>>>>,
}

impl BoqLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_item(&self, item: BoqItem) -> Result<(), CoreError> {
        validate_item(&item)?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| CoreError::poisoned("ledger"))?;
        if rows.contains_key(&item.id) {
            return Err(CoreError::Validation(format!(
                "BOQ item {} already registered",
                item.code
            )));
        }
        rows.insert(
            item.id,
            Arc::new(Mutex::new(LedgerRow {
                item,
                verified: Decimal::ZERO,
            })),
        );
        Ok(())
    }

    /// Replaces the descriptive and sanctioned fields; the verified total is kept.
    pub fn revise_item(&self, item: BoqItem) -> Result<(), CoreError> {
        validate_item(&item)?;
        let slot = self.row(item.id)?;
        let mut row = slot.lock().map_err(|_| CoreError::poisoned("ledger row"))?;
        if row.item.project_id != item.project_id {
            return Err(CoreError::Validation(
                "BOQ item cannot move between projects".into(),
            ));
        }
        row.item = item;
        Ok(())
    }

    pub fn item(&self, boq_item_id: Uuid) -> Result<BoqItem, CoreError> {
        let slot = self.row(boq_item_id)?;
        let row = slot.lock().map_err(|_| CoreError::poisoned("ledger row"))?;
        Ok(row.item.clone())
    }

    pub fn contains(&self, boq_item_id: Uuid) -> bool {
        self.rows
            .read()
            .map(|rows| rows.contains_key(&boq_item_id))
            .unwrap_or(false)
    }

    pub fn verified_quantity(&self, boq_item_id: Uuid) -> Result<Decimal, CoreError> {
        let slot = self.row(boq_item_id)?;
        let row = slot.lock().map_err(|_| CoreError::poisoned("ledger row"))?;
        Ok(row.verified)
    }

    /// Adds `delta` to the verified total. Overruns are reported, never rejected.
    pub fn record_verified(
        &self,
        boq_item_id: Uuid,
        delta: Decimal,
    ) -> Result<LedgerUpdate, CoreError> {
        self.record_verified_with(boq_item_id, delta, |_| Ok(()))
            .map(|(update, ())| update)
    }

    /// Adds `delta` and runs `commit` while the item row is locked.
    ///
    /// The new total is only stored when `commit` succeeds, so a caller can tie
    /// its own state change to the increment as a single all-or-nothing step.
    pub fn record_verified_with<T, F>(
        &self,
        boq_item_id: Uuid,
        delta: Decimal,
        commit: F,
    ) -> Result<(LedgerUpdate, T), CoreError>
    where
        F: FnOnce(&LedgerUpdate) -> Result<T, CoreError>,
    {
        if delta <= Decimal::ZERO {
            return Err(CoreError::Validation(
                "verified quantity delta must be greater than zero".into(),
            ));
        }
        let slot = self.row(boq_item_id)?;
        let mut row = slot.lock().map_err(|_| CoreError::poisoned("ledger row"))?;
        let new_total = row.verified.checked_add(delta).ok_or_else(|| {
            CoreError::Validation(format!("verified quantity overflow on {}", row.item.code))
        })?;
        let update = LedgerUpdate {
            boq_item_id,
            new_total,
            overrun: row.item.is_overrun(new_total),
        };
        let committed = commit(&update)?;
        row.verified = new_total;
        if update.overrun {
            tracing::warn!(
                item = %row.item.code,
                total = %new_total,
                sanctioned = %row.item.sanctioned_quantity,
                "verified quantity exceeds sanctioned quantity"
            );
        }
        Ok((update, committed))
    }

    /// Loads a persisted running total; only used when rebuilding from a snapshot.
    pub(crate) fn restore_balance(&self, balance: LedgerBalance) -> Result<(), CoreError> {
        let slot = self.row(balance.boq_item_id)?;
        let mut row = slot.lock().map_err(|_| CoreError::poisoned("ledger row"))?;
        row.verified = balance.verified_quantity;
        Ok(())
    }

    pub fn items(&self) -> Result<Vec<BoqItem>, CoreError> {
        Ok(self
            .rows_snapshot()?
            .into_iter()
            .map(|(item, _)| item)
            .collect())
    }

    pub fn balances(&self) -> Result<Vec<LedgerBalance>, CoreError> {
        Ok(self
            .rows_snapshot()?
            .into_iter()
            .map(|(item, verified)| LedgerBalance {
                boq_item_id: item.id,
                verified_quantity: verified,
            })
            .collect())
    }

    /// Items of a project with their verified totals, ordered by item code.
    pub fn project_rows(&self, project_id: Uuid) -> Result<Vec<(BoqItem, Decimal)>, CoreError> {
        Ok(self
            .rows_snapshot()?
            .into_iter()
            .filter(|(item, _)| item.project_id == project_id)
            .collect())
    }

    fn rows_snapshot(&self) -> Result<Vec<(BoqItem, Decimal)>, CoreError> {
        let slots: Vec<Arc<Mutex<LedgerRow>>> = self
            .rows
            .read()
            .map_err(|_| CoreError::poisoned("ledger"))?
            .values()
            .cloned()
            .collect();
        let mut rows = Vec::with_capacity(slots.len());
        for slot in slots {
            let row = slot.lock().map_err(|_| CoreError::poisoned("ledger row"))?;
            rows.push((row.item.clone(), row.verified));
        }
        rows.sort_by(|a, b| a.0.code.cmp(&b.0.code).then(a.0.id.cmp(&b.0.id)));
        Ok(rows)
    }

    fn row(&self, boq_item_id: Uuid) -> Result<Arc<Mutex<LedgerRow>>, CoreError> {
        self.rows
            .read()
            .map_err(|_| CoreError::poisoned("ledger"))?
            .get(&boq_item_id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("BOQ item", boq_item_id))
    }
}

fn validate_item(item: &BoqItem) -> Result<(), CoreError> {
    if item.code.trim().is_empty() {
        return Err(CoreError::Validation("BOQ item code is required".into()));
    }
    if item.sanctioned_quantity < Decimal::ZERO {
        return Err(CoreError::Validation(
            "sanctioned_quantity must not be negative".into(),
        ));
    }
    if item.rate < Decimal::ZERO {
        return Err(CoreError::Validation("rate must not be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn item(sanctioned: i64) -> BoqItem {
        BoqItem::new(
            Uuid::new_v4(),
            "1.1",
            "Earthwork in excavation",
            "cum",
            Decimal::from(sanctioned),
            Decimal::from(10),
        )
    }

    #[test]
    fn overrun_is_flagged_not_clamped() {
        let ledger = BoqLedger::new();
        let item = item(1000);
        let id = item.id;
        ledger.register_item(item).unwrap();

        let first = ledger.record_verified(id, Decimal::from(50)).unwrap();
        assert_eq!(first.new_total, Decimal::from(50));
        assert!(!first.overrun);

        let second = ledger.record_verified(id, Decimal::from(960)).unwrap();
        assert_eq!(second.new_total, Decimal::from(1010));
        assert!(second.overrun);
        assert_eq!(ledger.verified_quantity(id).unwrap(), Decimal::from(1010));
    }

    #[test]
    fn failed_commit_discards_increment() {
        let ledger = BoqLedger::new();
        let item = item(100);
        let id = item.id;
        ledger.register_item(item).unwrap();

        let result: Result<(LedgerUpdate, ()), _> =
            ledger.record_verified_with(id, Decimal::from(10), |_| {
                Err(CoreError::Conflict("lost the race".into()))
            });
        assert!(result.is_err());
        assert_eq!(ledger.verified_quantity(id).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn rejects_non_positive_delta_and_unknown_items() {
        let ledger = BoqLedger::new();
        let item = item(100);
        let id = item.id;
        ledger.register_item(item).unwrap();

        assert!(matches!(
            ledger.record_verified(id, Decimal::ZERO),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            ledger.record_verified(Uuid::new_v4(), Decimal::ONE),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let ledger = Arc::new(BoqLedger::new());
        let item = item(10_000);
        let id = item.id;
        ledger.register_item(item).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..250 {
                        ledger.record_verified(id, Decimal::ONE).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.verified_quantity(id).unwrap(), Decimal::from(2000));
    }
}
