//! Background poll loop
//!
//! Periodically runs [`SyncEngine::poll_once`] so changes made on other
//! devices show up. Polls never overlap: the next sleep starts only after
//! the previous poll finished. Shutdown cancels an in-flight poll.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::engine::SyncEngine;
use crate::remote::DocumentStore;
use crate::storage::LocalStore;

/// Commands sent to the poll task
#[derive(Debug)]
pub enum PollCommand {
    /// Poll right away instead of waiting for the next tick
    PollNow,
    /// Stop the poll task
    Shutdown,
}

/// Handle for controlling the background poll task
///
/// Dropping the handle aborts the task.
pub struct PollHandle {
    command_tx: mpsc::Sender<PollCommand>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Request an immediate poll
    pub fn poll_now(&self) {
        // A full queue already has a poll request pending
        let _ = self.command_tx.try_send(PollCommand::PollNow);
    }

    /// Stop polling and wait for the task to exit
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(PollCommand::Shutdown).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<L, R> SyncEngine<L, R>
where
    L: LocalStore + 'static,
    R: DocumentStore + 'static,
{
    /// Spawn the background poll loop
    ///
    /// Polls every `poll_interval` until the returned handle is shut down
    /// or dropped.
    pub fn spawn_poller(self: &Arc<Self>) -> PollHandle {
        let (command_tx, command_rx) = mpsc::channel(16);
        let task = tokio::spawn(poller_task(self.clone(), command_rx));

        PollHandle {
            command_tx,
            task: Some(task),
        }
    }
}

async fn poller_task<L, R>(
    engine: Arc<SyncEngine<L, R>>,
    mut command_rx: mpsc::Receiver<PollCommand>,
) where
    L: LocalStore,
    R: DocumentStore,
{
    let interval = engine.settings().poll_interval;
    debug!("Poller started ({:?} interval)", interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            cmd = command_rx.recv() => match cmd {
                Some(PollCommand::PollNow) => {}
                Some(PollCommand::Shutdown) | None => break,
            }
        }

        if !poll_until_shutdown(&engine, &mut command_rx).await {
            break;
        }
    }

    debug!("Poller stopped");
}

/// Run one poll, watching for shutdown meanwhile
///
/// Returns `false` if shutdown was requested.
async fn poll_until_shutdown<L, R>(
    engine: &SyncEngine<L, R>,
    command_rx: &mut mpsc::Receiver<PollCommand>,
) -> bool
where
    L: LocalStore,
    R: DocumentStore,
{
    let poll = engine.poll_once();
    tokio::pin!(poll);

    loop {
        tokio::select! {
            _ = &mut poll => return true,
            cmd = command_rx.recv() => match cmd {
                // Already polling
                Some(PollCommand::PollNow) => continue,
                Some(PollCommand::Shutdown) | None => {
                    engine.abandon_load();
                    return false;
                }
            }
        }
    }
}
