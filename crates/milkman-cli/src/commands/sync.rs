//! Sync command handlers

use anyhow::{bail, Result};

use milkman_core::sync::PushOutcome;

use crate::output::Output;
use crate::session::Engine;

/// Push the current ledger to the remote document now
pub async fn sync(engine: &Engine, output: &Output) -> Result<()> {
    if !engine.is_online() {
        bail!(
            "Sync is not available. Log in with:\n  \
             milkman login <token>\n\
             and make sure sync_enabled is true (milkman config show)"
        );
    }

    match engine.save().await {
        PushOutcome::Pushed {
            document_id,
            created: true,
        } => {
            output.success(&format!("Created remote document {}", document_id));
            output.message("Use this ID on your other devices:");
            output.message(&format!("  milkman link {}", document_id));
        }
        PushOutcome::Pushed { document_id, .. } => {
            output.success(&format!("Synced to remote document {}", document_id));
        }
        PushOutcome::Offline => bail!("Sync is not available (offline)"),
        PushOutcome::Failed { error } => bail!("Sync failed (saved locally): {}", error),
    }

    Ok(())
}

/// Use an existing remote document (from another device)
pub async fn link(engine: &Engine, id: String, output: &Output) -> Result<()> {
    let id = id.trim().to_string();
    if id.is_empty() {
        bail!("Document ID cannot be empty");
    }

    engine.set_document_id(Some(id.clone())).await;
    output.success(&format!("Linked to remote document {}", id));

    // Pick up the remote copy right away if it's newer
    engine.poll_once().await;
    Ok(())
}

/// Forget the remote document; the next sync creates a new one
pub async fn unlink(engine: &Engine, output: &Output) -> Result<()> {
    match engine.document_id().await {
        Some(id) => {
            engine.set_document_id(None).await;
            output.success(&format!("Unlinked from remote document {}", id));
        }
        None => output.message("Not linked to a remote document."),
    }
    Ok(())
}
