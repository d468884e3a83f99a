//! Milkman Core Library
//!
//! This crate provides the core functionality for Milkman, a single-user
//! stock ledger for a consumable (milk by default) that tracks restocks
//! and consumption and keeps devices in step through a remote document.
//!
//! # Architecture
//!
//! - **Ledger**: Pure state transitions over a count and a capped history
//! - **Local store**: Authoritative on-device copy, always written first
//! - **Remote store**: One private document holding the same snapshot,
//!   reconciled by last-writer-wins on the snapshot version
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = FileStore::new(&config.data_dir);
//! let client = GistClient::from_config(&config, token)?;
//! let engine = SyncEngine::new(store, client, Arc::new(TracingReporter), settings);
//!
//! engine.bootstrap().await;
//! engine.add(2).await?;
//! engine.drink(1).await?;
//! ```
//!
//! # Modules
//!
//! - `ledger`: Stock count, history log and undo
//! - `snapshot`: JSON form of the ledger shared by both stores
//! - `storage`: Local key-value persistence
//! - `remote`: Remote document store client
//! - `sync`: Load/merge/push engine, poller and status reporting
//! - `config`: Application configuration

pub mod config;
pub mod ledger;
pub mod remote;
pub mod snapshot;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use ledger::{HistoryRecord, Ledger, LedgerError, RecordKind};
pub use remote::{DocumentStore, GistClient, RemoteError};
pub use snapshot::SnapshotError;
pub use storage::{FileStore, LocalStore, MemoryStore, StorageError};
pub use sync::{SyncEngine, SyncEvent, SyncSettings};
