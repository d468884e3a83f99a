//! Serialized ledger snapshots
//!
//! The same JSON shape is written to the local store and to the remote
//! document. Anything that doesn't match the schema (bad JSON, missing
//! fields, wrong types, zero amounts, unknown schema numbers) is reported
//! as [`SnapshotError`] so callers can treat it as corrupt data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::{HistoryRecord, Ledger};

/// Current snapshot schema number
pub const SCHEMA_VERSION: u32 = 1;

/// Snapshot content failed validation
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Not valid JSON, or fields missing / of the wrong type
    #[error("Corrupt snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    /// Written by an incompatible schema
    #[error("Unsupported snapshot schema {found} (expected {expected})", expected = SCHEMA_VERSION)]
    UnsupportedSchema { found: u32 },

    /// A history record carries a zero amount
    #[error("Corrupt snapshot: history record {index} has a zero amount")]
    ZeroAmount { index: usize },
}

fn default_schema() -> u32 {
    SCHEMA_VERSION
}

/// On-disk / on-wire form of a [`Ledger`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default = "default_schema")]
    pub schema: u32,
    pub count: u32,
    pub history: Vec<HistoryRecord>,
    pub version: i64,
}

impl LedgerSnapshot {
    /// Capture a ledger
    pub fn from_ledger(ledger: &Ledger) -> Self {
        Self {
            schema: SCHEMA_VERSION,
            count: ledger.current_count(),
            history: ledger.history().to_vec(),
            version: ledger.version(),
        }
    }

    /// Check invariants that serde can't express
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema != SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedSchema { found: self.schema });
        }
        if let Some(index) = self.history.iter().position(|r| r.amount == 0) {
            return Err(SnapshotError::ZeroAmount { index });
        }
        Ok(())
    }

    pub fn into_ledger(self) -> Ledger {
        Ledger::from_parts(self.count, self.history, self.version)
    }
}

/// Serialize a ledger to snapshot JSON
pub fn encode(ledger: &Ledger) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(&LedgerSnapshot::from_ledger(ledger))?)
}

/// Parse and validate snapshot JSON
pub fn decode(json: &str) -> Result<Ledger, SnapshotError> {
    let snapshot: LedgerSnapshot = serde_json::from_str(json)?;
    snapshot.validate()?;
    Ok(snapshot.into_ledger())
}
