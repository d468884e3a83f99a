//! Engine construction from configuration

use std::sync::Arc;

use anyhow::{Context, Result};

use milkman_core::storage::keys;
use milkman_core::sync::{StatusReporter, SyncSettings};
use milkman_core::{Config, FileStore, GistClient, LocalStore, SyncEngine};

/// Engine over the on-disk store and the Gist-backed remote
pub type Engine = SyncEngine<FileStore, GistClient>;

/// Bearer token to use: MILKMAN_TOKEN first, then the stored credential
pub fn resolve_credential(config: &Config, store: &dyn LocalStore) -> Result<Option<String>> {
    if let Some(token) = &config.token_override {
        return Ok(Some(token.clone()));
    }

    let stored = store
        .get(keys::CREDENTIAL)
        .context("Failed to read stored credential")?;
    Ok(stored
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Build an engine for this invocation
///
/// The ledger still has to be loaded with `bootstrap()`.
pub fn open(config: &Config, reporter: Arc<dyn StatusReporter>) -> Result<Arc<Engine>> {
    let store = FileStore::new(&config.data_dir);
    let token = resolve_credential(config, &store)?;
    let client =
        GistClient::from_config(config, token).context("Failed to create remote client")?;

    Ok(Arc::new(SyncEngine::new(
        store,
        client,
        reporter,
        SyncSettings::from_config(config),
    )))
}

/// Whether a credential is available
pub fn has_credential(config: &Config) -> bool {
    let store = FileStore::new(&config.data_dir);
    matches!(resolve_credential(config, &store), Ok(Some(_)))
}
