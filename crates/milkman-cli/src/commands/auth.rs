//! Credential command handlers

use anyhow::{bail, Context, Result};

use milkman_core::storage::keys;
use milkman_core::LocalStore;

use crate::output::Output;

/// Store the bearer token for the remote store
pub fn login(store: &dyn LocalStore, token: String, output: &Output) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        bail!("Token cannot be empty");
    }

    store
        .set(keys::CREDENTIAL, token)
        .context("Failed to store credential")?;
    output.success("Logged in. Changes will now sync.");
    Ok(())
}

/// Remove the stored bearer token
pub fn logout(store: &dyn LocalStore, output: &Output) -> Result<()> {
    store
        .remove(keys::CREDENTIAL)
        .context("Failed to remove credential")?;
    output.success("Logged out. Data stays on this device.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use milkman_core::MemoryStore;

    #[test]
    fn test_login_logout() {
        let store = MemoryStore::new();
        let output = Output::new(OutputFormat::Quiet, 3);

        login(&store, " secret\n".to_string(), &output).unwrap();
        assert_eq!(
            store.get(keys::CREDENTIAL).unwrap().as_deref(),
            Some("secret")
        );

        logout(&store, &output).unwrap();
        assert_eq!(store.get(keys::CREDENTIAL).unwrap(), None);
    }

    #[test]
    fn test_empty_token_rejected() {
        let store = MemoryStore::new();
        let output = Output::new(OutputFormat::Quiet, 3);

        assert!(login(&store, "   ".to_string(), &output).is_err());
        assert_eq!(store.get(keys::CREDENTIAL).unwrap(), None);
    }
}
