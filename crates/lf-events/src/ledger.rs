// ledger.rs — Commission ledger boundary.
//
// The commission subsystem owns the ledger. The engine only asks it to
// create entries; entries are immutable once written and start `pending`
// until finance approves them.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EventError;
use crate::notify::append_jsonl;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    /// Paid when a goal target is achieved.
    GoalBonus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    Pending,
    Approved,
}

/// A payable amount credited to a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub entry_id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub entry_type: LedgerEntryType,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn pending(tenant_id: Uuid, user_id: Uuid, amount: Decimal, entry_type: LedgerEntryType) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            tenant_id,
            user_id,
            amount,
            entry_type,
            status: LedgerStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Ledger-write capability owned by the commission subsystem.
pub trait CommissionLedger: Send + Sync {
    fn create_entry(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        entry_type: LedgerEntryType,
    ) -> Result<LedgerEntry, EventError>;
}

/// Keeps entries in memory.
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn entries_for(&self, user_id: Uuid) -> Vec<LedgerEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect()
    }
}

impl CommissionLedger for MemoryLedger {
    fn create_entry(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        entry_type: LedgerEntryType,
    ) -> Result<LedgerEntry, EventError> {
        let entry = LedgerEntry::pending(tenant_id, user_id, amount, entry_type);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(entry)
    }
}

/// Appends entries as JSONL to a file.
pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CommissionLedger for JsonlLedger {
    fn create_entry(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        entry_type: LedgerEntryType,
    ) -> Result<LedgerEntry, EventError> {
        if amount <= Decimal::ZERO {
            return Err(EventError::LedgerFailed(format!(
                "refusing non-positive amount {}",
                amount
            )));
        }
        let entry = LedgerEntry::pending(tenant_id, user_id, amount, entry_type);
        append_jsonl(&self.path, &entry)?;
        Ok(entry)
    }
}
