//! Credential store trait and the in-memory implementation.

use async_trait::async_trait;

use crate::credentials::Credentials;
use crate::error::{StorageError, StorageResult};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Durable home of the session credentials.
///
/// There is at most one blob. `save` replaces it wholesale.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the stored blob.
    ///
    /// Returns `None` when nothing has been saved yet.
    async fn load(&self) -> StorageResult<Option<Credentials>>;

    /// Persist a blob, replacing any previous one.
    async fn save(&self, credentials: &Credentials) -> StorageResult<()>;

    /// Remove the stored blob.
    ///
    /// Returns `true` if a blob existed and was removed.
    async fn clear(&self) -> StorageResult<bool>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory credential store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: std::sync::RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `credentials`.
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            slot: std::sync::RwLock::new(Some(credentials)),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> StorageResult<Option<Credentials>> {
        let slot = self
            .slot
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(slot.clone())
    }

    async fn save(&self, credentials: &Credentials) -> StorageResult<()> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        *slot = Some(credentials.clone());
        Ok(())
    }

    async fn clear(&self) -> StorageResult<bool> {
        let mut slot = self
            .slot
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        Ok(slot.take().is_some())
    }
}
