//! Remote document store
//!
//! The ledger is mirrored as one opaque JSON file inside a single remote
//! document. [`DocumentStore`] is the contract the sync engine talks to;
//! [`GistClient`] implements it over HTTP.
//!
//! Without a credential the store is offline: operations return
//! [`RemoteError::Offline`], which the engine treats as a silent no-op.

mod gist;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use gist::GistClient;

/// Errors from the remote document store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No credential configured
    #[error("Remote store is offline (no credential configured)")]
    Offline,

    /// Document doesn't exist (or isn't visible with this credential)
    #[error("Document not found: {id}")]
    NotFound { id: String },

    /// Credential rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (DNS, connect, timeout, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-2xx response
    #[error("Remote store returned {status}: {message}")]
    Http { status: u16, message: String },

    /// Document exists but lacks the ledger file
    #[error("Document {id} has no file named '{filename}'")]
    MissingFile { id: String, filename: String },

    /// Response body didn't have the expected shape
    #[error("Unexpected response from remote store: {0}")]
    InvalidResponse(String),
}

/// A store holding one JSON blob per document
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether a credential is available
    fn is_online(&self) -> bool;

    /// Fetch the ledger file content of a document
    async fn read(&self, id: &str) -> Result<String, RemoteError>;

    /// Create a new document holding `content`, returning its identifier
    async fn create(&self, content: &str) -> Result<String, RemoteError>;

    /// Overwrite the content of an existing document
    async fn update(&self, id: &str, content: &str) -> Result<(), RemoteError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn is_online(&self) -> bool {
        (**self).is_online()
    }

    async fn read(&self, id: &str) -> Result<String, RemoteError> {
        (**self).read(id).await
    }

    async fn create(&self, content: &str) -> Result<String, RemoteError> {
        (**self).create(content).await
    }

    async fn update(&self, id: &str, content: &str) -> Result<(), RemoteError> {
        (**self).update(id, content).await
    }
}
