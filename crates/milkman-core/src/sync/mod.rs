//! Sync engine for the remote document store
//!
//! Keeps the ledger consistent across the local store and one remote
//! document per user.
//!
//! ## Protocol
//!
//! 1. Load: read the remote document (retrying transient failures),
//!    adopt it iff its version is strictly newer
//! 2. Mutate: apply, persist locally, then push
//! 3. Poll: repeat the load step in the background, never pushing
//!
//! ## Usage
//!
//! ```ignore
//! let engine = Arc::new(SyncEngine::new(store, client, reporter, settings));
//! engine.bootstrap().await;
//! let poller = engine.spawn_poller();
//! engine.drink(1).await?;
//! poller.shutdown().await;
//! ```

mod engine;
mod poller;
mod status;

pub use engine::{should_adopt, SyncEngine, SyncSettings, Undone};
pub use poller::{PollCommand, PollHandle};
pub use status::{
    ChannelReporter, LoadOutcome, LoadPhase, PushOutcome, PushPhase, RemoteLoad, StatusLevel,
    StatusReporter, SyncEvent, TracingReporter,
};
