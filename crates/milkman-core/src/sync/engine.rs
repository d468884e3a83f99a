//! Sync engine
//!
//! Owns the live [`Ledger`] and reconciles it between the local store and
//! the remote document store.
//!
//! ## Ordering
//!
//! - A mutation is applied in memory and persisted locally before its
//!   push is issued. Local persistence is authoritative; a failed push
//!   never rolls it back.
//! - No lock is held across a remote call. A remote read that completes
//!   after a newer local mutation carries an older version and is
//!   discarded on arrival: the version comparison in [`should_adopt`] is
//!   the only arbitration between polls and pushes.
//! - Pushes are serialized among themselves so two racing saves can't
//!   both create a remote document.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::status::{
    LoadOutcome, LoadPhase, PushOutcome, PushPhase, RemoteLoad, StatusReporter, SyncEvent,
};
use crate::config::Config;
use crate::ledger::{HistoryRecord, Ledger, LedgerError};
use crate::remote::{DocumentStore, RemoteError};
use crate::snapshot;
use crate::storage::{keys, LocalStore};

/// Timing and retry knobs for the engine
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Extra remote read attempts after the first failure
    pub load_retries: u32,
    /// Fixed delay between remote read attempts
    pub retry_delay: Duration,
    /// Interval between background polls
    pub poll_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            load_retries: 2,
            retry_delay: Duration::from_millis(1500),
            poll_interval: Duration::from_secs(3),
        }
    }
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            load_retries: config.load_retries,
            retry_delay: config.retry_delay(),
            poll_interval: config.poll_interval(),
        }
    }
}

/// Merge rule: adopt the remote ledger iff its version is strictly newer
pub fn should_adopt(local_version: i64, remote_version: i64) -> bool {
    remote_version > local_version
}

/// An undo that actually reverted something
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Undone {
    /// The record that was removed
    pub record: HistoryRecord,
    /// What happened when the result was pushed
    pub push: PushOutcome,
}

/// Local snapshot lookup result
enum LocalLoad {
    Found(Ledger),
    Missing,
    Corrupt,
}

/// Ledger + local store + remote store
pub struct SyncEngine<L, R> {
    ledger: Mutex<Ledger>,
    document_id: Mutex<Option<String>>,
    /// Held for the duration of a push
    push_gate: Mutex<()>,
    local: L,
    remote: R,
    reporter: Arc<dyn StatusReporter>,
    settings: SyncSettings,
    load_phase: watch::Sender<LoadPhase>,
    push_phase: watch::Sender<PushPhase>,
}

impl<L, R> SyncEngine<L, R>
where
    L: LocalStore,
    R: DocumentStore,
{
    /// Create an engine
    ///
    /// The ledger starts out as the default one; call [`bootstrap`](Self::bootstrap)
    /// to construct the session ledger from the stores.
    pub fn new(
        local: L,
        remote: R,
        reporter: Arc<dyn StatusReporter>,
        settings: SyncSettings,
    ) -> Self {
        let document_id = match local.get(keys::DOCUMENT_ID) {
            Ok(id) => id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            Err(e) => {
                warn!("Could not read remote document id: {}", e);
                None
            }
        };

        let (load_phase, _) = watch::channel(LoadPhase::Idle);
        let (push_phase, _) = watch::channel(PushPhase::Idle);

        Self {
            ledger: Mutex::new(Ledger::default()),
            document_id: Mutex::new(document_id),
            push_gate: Mutex::new(()),
            local,
            remote,
            reporter,
            settings,
            load_phase,
            push_phase,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Snapshot of the current ledger
    pub async fn ledger(&self) -> Ledger {
        self.ledger.lock().await.clone()
    }

    /// Current stock count
    pub async fn current_count(&self) -> u32 {
        self.ledger.lock().await.current_count()
    }

    /// Identifier of the remote document, once known
    pub async fn document_id(&self) -> Option<String> {
        self.document_id.lock().await.clone()
    }

    /// Point the engine at an existing remote document (or forget it)
    pub async fn set_document_id(&self, id: Option<String>) {
        let id = id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let result = match &id {
            Some(id) => self.local.set(keys::DOCUMENT_ID, id),
            None => self.local.remove(keys::DOCUMENT_ID),
        };
        if let Err(e) = result {
            warn!("Could not persist remote document id: {}", e);
        }
        *self.document_id.lock().await = id;
    }

    /// Whether the remote store can be used at all
    pub fn is_online(&self) -> bool {
        self.remote.is_online()
    }

    pub fn load_phase(&self) -> LoadPhase {
        *self.load_phase.borrow()
    }

    pub fn push_phase(&self) -> PushPhase {
        *self.push_phase.borrow()
    }

    /// Reset the load phase after a load was cancelled mid-flight
    pub(crate) fn abandon_load(&self) {
        self.load_phase.send_replace(LoadPhase::Idle);
    }

    /// Watch load progress
    pub fn subscribe_load(&self) -> watch::Receiver<LoadPhase> {
        self.load_phase.subscribe()
    }

    /// Watch push progress
    pub fn subscribe_push(&self) -> watch::Receiver<PushPhase> {
        self.push_phase.subscribe()
    }

    // ==================== Load ====================

    /// Construct the session ledger
    ///
    /// Starts from the local snapshot (or the default ledger), then runs
    /// the remote load protocol; the remote snapshot wins only if it is
    /// strictly newer. Corrupt data on either side resets to the default
    /// ledger.
    pub async fn bootstrap(&self) -> LoadOutcome {
        let (base, fallback) = match self.read_local() {
            LocalLoad::Found(ledger) => (ledger, LoadOutcome::LocalFallback),
            LocalLoad::Missing => (Ledger::default(), LoadOutcome::DefaultInitialized),
            LocalLoad::Corrupt => (Ledger::default(), LoadOutcome::CorruptReset),
        };
        *self.ledger.lock().await = base;

        let outcome = match self.load_remote().await {
            RemoteLoad::Adopted { version } => LoadOutcome::CloudLoaded { version },
            RemoteLoad::Stale { local_version, .. } => LoadOutcome::UpToDate {
                version: local_version,
            },
            RemoteLoad::Offline | RemoteLoad::Failed { .. } => fallback,
            RemoteLoad::Corrupt { .. } => {
                *self.ledger.lock().await = Ledger::default();
                LoadOutcome::CorruptReset
            }
        };

        info!("Session ledger ready: {:?}", outcome);
        self.reporter.report(&SyncEvent::Loaded(outcome.clone()));
        outcome
    }

    /// One read-only check of the remote store
    ///
    /// Never pushes. A result that isn't newer than the live ledger is
    /// discarded without effect.
    pub async fn poll_once(&self) -> RemoteLoad {
        let result = self.load_remote().await;
        self.reporter.report(&SyncEvent::Polled(result.clone()));
        result
    }

    /// Remote load protocol: read with bounded retries, then merge
    async fn load_remote(&self) -> RemoteLoad {
        if !self.remote.is_online() {
            return RemoteLoad::Offline;
        }
        let Some(id) = self.document_id().await else {
            debug!("No remote document yet, skipping load");
            return RemoteLoad::Offline;
        };

        self.load_phase.send_replace(LoadPhase::Loading);

        let result = match self.read_with_retry(&id).await {
            Ok(content) => match snapshot::decode(&content) {
                Ok(remote) => self.merge(remote).await,
                Err(e) => {
                    warn!("Remote document {} is corrupt: {}", id, e);
                    RemoteLoad::Corrupt {
                        error: e.to_string(),
                    }
                }
            },
            Err(RemoteError::Offline) => RemoteLoad::Offline,
            Err(e) => RemoteLoad::Failed {
                error: e.to_string(),
            },
        };

        let finished = match result {
            RemoteLoad::Failed { .. } | RemoteLoad::Corrupt { .. } => LoadPhase::Failed,
            _ => LoadPhase::Loaded,
        };
        self.load_phase.send_replace(finished);

        result
    }

    async fn read_with_retry(&self, id: &str) -> Result<String, RemoteError> {
        let attempts = self.settings.load_retries + 1;
        let mut attempt = 1;

        loop {
            match self.remote.read(id).await {
                Ok(content) => return Ok(content),
                Err(RemoteError::Offline) => return Err(RemoteError::Offline),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Remote read failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempt, attempts, e, self.settings.retry_delay
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Remote read failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }

    /// Adopt `remote` if it is strictly newer than the live ledger
    async fn merge(&self, remote: Ledger) -> RemoteLoad {
        let mut ledger = self.ledger.lock().await;
        let local_version = ledger.version();
        let remote_version = remote.version();

        if !should_adopt(local_version, remote_version) {
            debug!(
                "Discarding remote snapshot v{} (local v{})",
                remote_version, local_version
            );
            return RemoteLoad::Stale {
                remote_version,
                local_version,
            };
        }

        info!(
            "Adopting remote snapshot v{} (local v{})",
            remote_version, local_version
        );
        *ledger = remote;
        self.persist_local(&ledger);
        RemoteLoad::Adopted {
            version: remote_version,
        }
    }

    fn read_local(&self) -> LocalLoad {
        match self.local.get(keys::LEDGER) {
            Ok(Some(json)) => match snapshot::decode(&json) {
                Ok(ledger) => LocalLoad::Found(ledger),
                Err(e) => {
                    warn!("Local ledger snapshot is corrupt, starting fresh: {}", e);
                    LocalLoad::Corrupt
                }
            },
            Ok(None) => LocalLoad::Missing,
            Err(e) => {
                warn!("Could not read local ledger snapshot, starting fresh: {}", e);
                LocalLoad::Corrupt
            }
        }
    }

    /// Write the ledger to the local store
    ///
    /// Failures are logged only.
    fn persist_local(&self, ledger: &Ledger) {
        let json = match snapshot::encode(ledger) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to encode ledger: {}", e);
                return;
            }
        };

        match self.local.set(keys::LEDGER, &json) {
            Ok(()) => debug!("Saved ledger v{} locally", ledger.version()),
            Err(e) => {
                warn!("Failed to save ledger locally: {}", e);
                if let Some(hint) = e.recovery_suggestion() {
                    warn!("{}", hint);
                }
            }
        }
    }

    // ==================== Mutations ====================

    /// Add units to stock, persist, push
    pub async fn add(&self, amount: u32) -> Result<PushOutcome, LedgerError> {
        self.apply(|ledger| ledger.add(amount)).await?;
        Ok(self.push().await)
    }

    /// Consume units from stock, persist, push
    ///
    /// Rejected without any side effect when stock is insufficient.
    pub async fn drink(&self, amount: u32) -> Result<PushOutcome, LedgerError> {
        self.apply(|ledger| ledger.drink(amount)).await?;
        Ok(self.push().await)
    }

    /// Revert the most recent record, persist, push
    ///
    /// `Ok(None)` when there was nothing to undo; nothing is saved then.
    pub async fn undo(&self) -> Result<Option<Undone>, LedgerError> {
        let Some(record) = self.apply(|ledger| ledger.undo()).await? else {
            return Ok(None);
        };
        let push = self.push().await;
        Ok(Some(Undone { record, push }))
    }

    /// Persist locally, then push, without mutating
    pub async fn save(&self) -> PushOutcome {
        {
            let ledger = self.ledger.lock().await;
            self.persist_local(&ledger);
        }
        self.push().await
    }

    /// Apply a transition and persist the result locally
    ///
    /// Ledger transitions are all-or-nothing, so an error leaves nothing
    /// to persist.
    async fn apply<T>(
        &self,
        op: impl FnOnce(&mut Ledger) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut ledger = self.ledger.lock().await;
        let before = ledger.version();
        let value = op(&mut ledger)?;
        if ledger.version() != before {
            self.persist_local(&ledger);
        }
        Ok(value)
    }

    // ==================== Push ====================

    /// Upsert the current snapshot to the remote store
    async fn push(&self) -> PushOutcome {
        if !self.remote.is_online() {
            debug!("Offline, skipping push");
            let outcome = PushOutcome::Offline;
            self.reporter.report(&SyncEvent::Pushed(outcome.clone()));
            return outcome;
        }

        let _gate = self.push_gate.lock().await;
        self.push_phase.send_replace(PushPhase::Pushing);

        let outcome = match self.upsert().await {
            Ok((document_id, created)) => {
                info!("Pushed ledger to remote document {}", document_id);
                PushOutcome::Pushed {
                    document_id,
                    created,
                }
            }
            Err(RemoteError::Offline) => PushOutcome::Offline,
            Err(e) => {
                warn!("Push failed, local copy kept: {}", e);
                PushOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        let finished = if outcome.is_failure() {
            PushPhase::Failed
        } else {
            PushPhase::Pushed
        };
        self.push_phase.send_replace(finished);

        self.reporter.report(&SyncEvent::Pushed(outcome.clone()));
        outcome
    }

    /// Create the document if none is known, update it otherwise
    async fn upsert(&self) -> Result<(String, bool), RemoteError> {
        // Snapshot taken after acquiring the push gate: always the latest
        let content = {
            let ledger = self.ledger.lock().await;
            snapshot::encode(&ledger)
                .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?
        };

        match self.document_id().await {
            Some(id) => {
                self.remote.update(&id, &content).await?;
                Ok((id, false))
            }
            None => {
                let id = self.remote.create(&content).await?;
                info!("Created remote document {}", id);
                self.set_document_id(Some(id.clone())).await;
                Ok((id, true))
            }
        }
    }
}
