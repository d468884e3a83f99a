//! Stock command handlers

use anyhow::Result;

use crate::output::Output;
use crate::session::Engine;

/// Show count, recent history and sync state
pub async fn status(engine: &Engine, output: &Output) -> Result<()> {
    let ledger = engine.ledger().await;
    let sync = sync_label(engine).await;
    output.print_ledger(&ledger, &sync);
    Ok(())
}

/// Add units to stock
pub async fn add(engine: &Engine, amount: u32, output: &Output) -> Result<()> {
    engine.add(amount).await?;
    output.print_change(&format!("Added {}", amount), &engine.ledger().await);
    Ok(())
}

/// Consume units from stock
pub async fn drink(engine: &Engine, amount: u32, output: &Output) -> Result<()> {
    engine.drink(amount).await?;
    output.print_change(&format!("Drank {}", amount), &engine.ledger().await);
    Ok(())
}

/// Revert the most recent change
pub async fn undo(engine: &Engine, output: &Output) -> Result<()> {
    match engine.undo().await? {
        Some(undone) => {
            let message = format!("Undid {} of {}", undone.record.kind, undone.record.amount);
            output.print_change(&message, &engine.ledger().await);
        }
        None => output.message("Nothing to undo."),
    }
    Ok(())
}

/// List history, newest first
pub async fn history(engine: &Engine, all: bool, output: &Output) -> Result<()> {
    let ledger = engine.ledger().await;
    if all {
        output.print_history(ledger.history().iter().rev());
    } else {
        output.print_history(ledger.recent(milkman_core::ledger::RECENT_LIMIT));
    }
    Ok(())
}

async fn sync_label(engine: &Engine) -> String {
    if !engine.is_online() {
        return "offline (run `milkman login <token>` to sync)".to_string();
    }
    match engine.document_id().await {
        Some(id) => format!("online (document {})", id),
        None => "online (no remote document yet)".to_string(),
    }
}
