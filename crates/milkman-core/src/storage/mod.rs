//! Local storage layer
//!
//! Synchronous key → JSON-string persistence. Three keys are used:
//!
//! - [`keys::LEDGER`]: the ledger snapshot (count, capped history, version)
//! - [`keys::DOCUMENT_ID`]: identifier of the remote document, once known
//! - [`keys::CREDENTIAL`]: the bearer token for the remote store

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::{FileStore, LocalStore, MemoryStore};

/// Keys used in the local store
pub mod keys {
    /// Ledger snapshot
    pub const LEDGER: &str = "ledger";
    /// Remote document identifier
    pub const DOCUMENT_ID: &str = "document_id";
    /// Remote store bearer credential
    pub const CREDENTIAL: &str = "credential";
}
