//! Watch command handler

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use milkman_core::sync::{ChannelReporter, RemoteLoad, SyncEvent};
use milkman_core::Config;

use crate::output::Output;
use crate::session;

/// Poll the remote document until Ctrl-C, printing changes as they arrive
pub async fn watch(config: &Config, output: &Output) -> Result<()> {
    let (reporter, mut events) = ChannelReporter::channel();
    let engine = session::open(config, Arc::new(reporter))?;

    if !engine.is_online() {
        bail!("Nothing to watch while offline. Log in with:\n  milkman login <token>");
    }

    engine.bootstrap().await;
    if engine.document_id().await.is_none() {
        bail!(
            "No remote document yet. Run `milkman sync` to create one,\n\
             or `milkman link <id>` to use one from another device."
        );
    }

    let ledger = engine.ledger().await;
    output.message(&format!(
        "Milk in stock: {}. Watching for changes every {}s (Ctrl-C to stop)...",
        ledger.current_count(),
        engine.settings().poll_interval.as_secs()
    ));

    let poller = engine.spawn_poller();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            Some(event) = events.recv() => match event {
                SyncEvent::Polled(RemoteLoad::Adopted { .. }) => {
                    output.print_event(&event);
                    output.print_change("Updated from another device", &engine.ledger().await);
                }
                event if event.is_noteworthy() => output.print_event(&event),
                _ => {}
            }
        }
    }

    poller.shutdown().await;
    output.message("Stopped watching.");
    Ok(())
}
