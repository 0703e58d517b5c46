use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use rust_decimal::Decimal;
use worksbill_domain::ProjectBook;

use crate::CoreError;

/// Describes a persisted backup artifact for a project book.
#[derive(Debug, Clone)]
pub struct ProjectBackupInfo {
    pub book: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Abstraction over persistence backends capable of storing project books and backups.
pub trait ProjectStorage: Send + Sync {
    fn save_book(&self, name: &str, book: &ProjectBook) -> Result<(), CoreError>;
    fn load_book(&self, name: &str) -> Result<ProjectBook, CoreError>;
    fn list_books(&self) -> Result<Vec<String>, CoreError>;
    fn delete_book(&self, name: &str) -> Result<(), CoreError>;
    fn save_book_to_path(&self, book: &ProjectBook, path: &Path) -> Result<(), CoreError>;
    fn load_book_from_path(&self, path: &Path) -> Result<ProjectBook, CoreError>;
    fn backup_book(
        &self,
        name: &str,
        book: &ProjectBook,
        note: Option<&str>,
    ) -> Result<ProjectBackupInfo, CoreError>;
    fn list_backups(&self, name: &str) -> Result<Vec<ProjectBackupInfo>, CoreError>;
    fn restore_backup(&self, backup: &ProjectBackupInfo) -> Result<ProjectBook, CoreError>;
}

/// Detects dangling references and other anomalies within a book snapshot.
pub fn book_warnings(book: &ProjectBook) -> Vec<String> {
    let project_ids: HashSet<_> = book.projects.iter().map(|p| p.id).collect();
    let item_ids: HashSet<_> = book.boq_items.iter().map(|i| i.id).collect();
    let fund_ids: HashSet<_> = book.fund_heads.iter().map(|f| f.id).collect();
    let mut warnings = Vec::new();

    for item in &book.boq_items {
        if !project_ids.contains(&item.project_id) {
            warnings.push(format!(
                "BOQ item {} references unknown project {}",
                item.code, item.project_id
            ));
        }
        if let Some(fund) = item.fund_head_id {
            if !fund_ids.contains(&fund) {
                warnings.push(format!(
                    "BOQ item {} references missing fund head {}",
                    item.code, fund
                ));
            }
        }
    }
    for balance in &book.balances {
        if !item_ids.contains(&balance.boq_item_id) {
            warnings.push(format!(
                "ledger balance references unknown BOQ item {}",
                balance.boq_item_id
            ));
        }
        if balance.verified_quantity < Decimal::ZERO {
            warnings.push(format!(
                "ledger balance for {} is negative",
                balance.boq_item_id
            ));
        }
    }
    for exec in &book.executions {
        if !item_ids.contains(&exec.boq_item_id) {
            warnings.push(format!(
                "execution {} references unknown BOQ item {}",
                exec.id, exec.boq_item_id
            ));
        }
    }
    for bill in &book.bills {
        if !project_ids.contains(&bill.project_id) {
            warnings.push(format!(
                "bill {} references unknown project {}",
                bill.bill_number, bill.project_id
            ));
        }
        if let Some(fund) = bill.fund_head_id {
            if !fund_ids.contains(&fund) {
                warnings.push(format!(
                    "bill {} references missing fund head {}",
                    bill.bill_number, fund
                ));
            }
        }
    }
    for line in &book.budget_lines {
        if !fund_ids.contains(&line.fund_head_id) {
            warnings.push(format!(
                "budget line {} references missing fund head {}",
                line.id, line.fund_head_id
            ));
        }
    }
    for milestone in &book.milestones {
        if milestone.planned_start > milestone.planned_end {
            warnings.push(format!(
                "milestone {} ends before it starts",
                milestone.name
            ));
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use worksbill_domain::{BoqItem, LedgerBalance, Project};

    #[test]
    fn flags_items_without_project_and_orphan_balances() {
        let mut book = ProjectBook::new("Warnings");
        let project = Project::new("P-1", "Ring road");
        let orphan = BoqItem::new(
            uuid::Uuid::new_v4(),
            "9.9",
            "Orphan",
            "nos",
            Decimal::ONE,
            Decimal::ONE,
        );
        book.projects.push(project);
        book.balances.push(LedgerBalance {
            boq_item_id: uuid::Uuid::new_v4(),
            verified_quantity: Decimal::ONE,
        });
        book.boq_items.push(orphan);

        let warnings = book_warnings(&book);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("unknown project"));
        assert!(warnings[1].contains("unknown BOQ item"));
    }
}
