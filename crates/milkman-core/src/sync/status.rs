//! Sync status reporting
//!
//! Load and push progress are two independent state machines:
//!
//! - Load: `Idle → Loading → {Loaded, Failed}`
//! - Push: `Idle → Pushing → {Pushed, Failed}`
//!
//! A finished phase stays current until the next cycle starts. A load
//! cancelled mid-flight returns to `Idle`.
//!
//! Outcomes are emitted as [`SyncEvent`]s to a [`StatusReporter`], which
//! turns them into transient human-readable status.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Remote load progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Remote push progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPhase {
    Idle,
    Pushing,
    Pushed,
    Failed,
}

/// How the session ledger was constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The remote snapshot was newer and was adopted
    CloudLoaded { version: i64 },
    /// The remote snapshot was reachable but not newer than the local one
    UpToDate { version: i64 },
    /// Remote unavailable; the local snapshot was used
    LocalFallback,
    /// Nothing stored anywhere; a fresh ledger was created
    DefaultInitialized,
    /// The local snapshot was corrupt; a fresh ledger was created
    CorruptReset,
}

/// Result of one pass of the remote load protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLoad {
    /// Remote version was strictly newer and replaced the ledger
    Adopted { version: i64 },
    /// Remote version was older or equal; ledger unchanged
    Stale { remote_version: i64, local_version: i64 },
    /// No credential or no known document
    Offline,
    /// Every attempt failed
    Failed { error: String },
    /// Remote content didn't parse as a ledger snapshot
    Corrupt { error: String },
}

/// Result of pushing the ledger to the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Remote store now holds the pushed snapshot
    Pushed { document_id: String, created: bool },
    /// No credential; only the local copy was saved
    Offline,
    /// Remote write failed; the local copy still holds the change
    Failed { error: String },
}

impl PushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PushOutcome::Failed { .. })
    }
}

/// Something the user should hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Session ledger constructed
    Loaded(LoadOutcome),
    /// A background poll finished
    Polled(RemoteLoad),
    /// A save reached (or failed to reach) the remote store
    Pushed(PushOutcome),
}

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl SyncEvent {
    pub fn level(&self) -> StatusLevel {
        match self {
            SyncEvent::Loaded(LoadOutcome::CloudLoaded { .. })
            | SyncEvent::Loaded(LoadOutcome::UpToDate { .. })
            | SyncEvent::Polled(RemoteLoad::Adopted { .. })
            | SyncEvent::Pushed(PushOutcome::Pushed { .. }) => StatusLevel::Success,
            SyncEvent::Loaded(LoadOutcome::LocalFallback)
            | SyncEvent::Polled(RemoteLoad::Failed { .. })
            | SyncEvent::Polled(RemoteLoad::Corrupt { .. }) => StatusLevel::Warning,
            SyncEvent::Loaded(LoadOutcome::CorruptReset)
            | SyncEvent::Pushed(PushOutcome::Failed { .. }) => StatusLevel::Error,
            _ => StatusLevel::Info,
        }
    }

    /// Whether the user would want to see this while idle
    ///
    /// Polls that change nothing are noise.
    pub fn is_noteworthy(&self) -> bool {
        !matches!(
            self,
            SyncEvent::Polled(RemoteLoad::Stale { .. }) | SyncEvent::Polled(RemoteLoad::Offline)
        )
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::Loaded(outcome) => match outcome {
                LoadOutcome::CloudLoaded { .. } => write!(f, "Cloud data loaded"),
                LoadOutcome::UpToDate { .. } => write!(f, "Local data is up to date with the cloud"),
                LoadOutcome::LocalFallback => write!(f, "Using local data"),
                LoadOutcome::DefaultInitialized => write!(f, "Initialized new data"),
                LoadOutcome::CorruptReset => write!(f, "Load failed, using default data"),
            },
            SyncEvent::Polled(result) => match result {
                RemoteLoad::Adopted { .. } => write!(f, "Newer data received from the cloud"),
                RemoteLoad::Stale { .. } => write!(f, "Already up to date"),
                RemoteLoad::Offline => write!(f, "Offline"),
                RemoteLoad::Failed { error } => write!(f, "Cloud check failed: {}", error),
                RemoteLoad::Corrupt { error } => write!(f, "Cloud data is corrupt: {}", error),
            },
            SyncEvent::Pushed(outcome) => match outcome {
                PushOutcome::Pushed { .. } => write!(f, "Data synced"),
                PushOutcome::Offline => write!(f, "Saved locally (offline)"),
                PushOutcome::Failed { error } => {
                    write!(f, "Sync failed (saved locally): {}", error)
                }
            },
        }
    }
}

/// Receives sync outcomes
pub trait StatusReporter: Send + Sync {
    fn report(&self, event: &SyncEvent);
}

/// Reporter that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn report(&self, event: &SyncEvent) {
        match event.level() {
            StatusLevel::Warning | StatusLevel::Error => warn!("{}", event),
            _ if event.is_noteworthy() => info!("{}", event),
            _ => debug!("{}", event),
        }
    }
}

/// Reporter that forwards events over a channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelReporter {
    /// Create a reporter and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StatusReporter for ChannelReporter {
    fn report(&self, event: &SyncEvent) {
        // Receiver gone just means nobody is listening anymore
        let _ = self.tx.send(event.clone());
    }
}
