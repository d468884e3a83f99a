//! Stock ledger
//!
//! Pure state transitions over the stock count and its history log.
//! No I/O happens here; persistence and sync are layered on top by
//! the [`SyncEngine`](crate::sync::SyncEngine).
//!
//! Every successful `add`/`drink` appends exactly one [`HistoryRecord`]
//! and bumps the version. `undo` pops the most recent record and reverts
//! it. A rejected operation leaves the ledger untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of history records kept (older records are dropped)
pub const HISTORY_LIMIT: usize = 50;

/// Stock a brand-new ledger starts with
pub const DEFAULT_STOCK: u32 = 3;

/// Number of records shown by the recent-history projection
pub const RECENT_LIMIT: usize = 5;

/// Errors raised by ledger transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Tried to consume more units than are in stock
    #[error("Insufficient stock: requested {requested}, only {available} left")]
    InsufficientStock { requested: u32, available: u32 },

    /// Amounts must be positive
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// The last record cannot be reverted against the current count
    #[error("Cannot undo add of {amount}: only {available} in stock")]
    InconsistentHistory { amount: u32, available: u32 },

    /// The count cannot hold the result
    #[error("Stock overflow: cannot add {amount} to {available}")]
    Overflow { amount: u32, available: u32 },
}

/// What a history record did to the stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Units were added (restock)
    Add,
    /// Units were consumed
    Drink,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Add => write!(f, "add"),
            RecordKind::Drink => write!(f, "drink"),
        }
    }
}

/// A single entry in the history log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Kind of transition
    pub kind: RecordKind,
    /// Units moved (always positive)
    pub amount: u32,
    /// When the transition happened
    pub time: DateTime<Utc>,
}

/// In-memory stock ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    count: u32,
    history: Vec<HistoryRecord>,
    version: i64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            count: DEFAULT_STOCK,
            history: Vec::new(),
            version: 0,
        }
    }
}

impl Ledger {
    /// Create a ledger with the default starting stock
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored parts
    ///
    /// History beyond [`HISTORY_LIMIT`] is dropped from the front.
    pub fn from_parts(count: u32, mut history: Vec<HistoryRecord>, version: i64) -> Self {
        if history.len() > HISTORY_LIMIT {
            history.drain(..history.len() - HISTORY_LIMIT);
        }
        Self {
            count,
            history,
            version,
        }
    }

    /// Current stock count
    pub fn current_count(&self) -> u32 {
        self.count
    }

    /// Full (capped) history, oldest first
    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Most recent records, newest first
    ///
    /// Read-only projection; the stored log is not touched.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &HistoryRecord> {
        self.history.iter().rev().take(limit)
    }

    /// Version used for merge arbitration
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Whether there is anything to undo
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Whether stock is at or below the given threshold
    pub fn is_low(&self, threshold: u32) -> bool {
        self.count <= threshold
    }

    /// Add units to stock
    pub fn add(&mut self, amount: u32) -> Result<(), LedgerError> {
        self.add_at(amount, Utc::now())
    }

    /// Add units to stock at an explicit time
    pub fn add_at(&mut self, amount: u32, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.count = self
            .count
            .checked_add(amount)
            .ok_or(LedgerError::Overflow {
                amount,
                available: self.count,
            })?;
        self.record(RecordKind::Add, amount, now);
        Ok(())
    }

    /// Consume units from stock
    ///
    /// Fails with [`LedgerError::InsufficientStock`] when `amount` exceeds
    /// the current count, leaving the ledger unchanged.
    pub fn drink(&mut self, amount: u32) -> Result<(), LedgerError> {
        self.drink_at(amount, Utc::now())
    }

    /// Consume units from stock at an explicit time
    pub fn drink_at(&mut self, amount: u32, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > self.count {
            return Err(LedgerError::InsufficientStock {
                requested: amount,
                available: self.count,
            });
        }
        self.count -= amount;
        self.record(RecordKind::Drink, amount, now);
        Ok(())
    }

    /// Revert the most recent history record
    ///
    /// Returns the reverted record, or `None` when the log is empty.
    /// Undo does not append a record of its own.
    pub fn undo(&mut self) -> Result<Option<HistoryRecord>, LedgerError> {
        self.undo_at(Utc::now())
    }

    /// Revert the most recent history record at an explicit time
    pub fn undo_at(&mut self, now: DateTime<Utc>) -> Result<Option<HistoryRecord>, LedgerError> {
        let Some(last) = self.history.last() else {
            return Ok(None);
        };

        let count = match last.kind {
            RecordKind::Add => {
                self.count
                    .checked_sub(last.amount)
                    .ok_or(LedgerError::InconsistentHistory {
                        amount: last.amount,
                        available: self.count,
                    })?
            }
            RecordKind::Drink => {
                self.count
                    .checked_add(last.amount)
                    .ok_or(LedgerError::Overflow {
                        amount: last.amount,
                        available: self.count,
                    })?
            }
        };

        self.count = count;
        let record = self.history.pop();
        self.bump_version(now);
        Ok(record)
    }

    fn record(&mut self, kind: RecordKind, amount: u32, now: DateTime<Utc>) {
        self.history.push(HistoryRecord {
            kind,
            amount,
            time: now,
        });
        if self.history.len() > HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.bump_version(now);
    }

    /// Versions are strictly increasing even if the clock stalls or goes back
    fn bump_version(&mut self, now: DateTime<Utc>) {
        self.version = now.timestamp_millis().max(self.version.saturating_add(1));
    }
}
