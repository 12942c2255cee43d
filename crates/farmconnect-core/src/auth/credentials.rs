use std::sync::Mutex;

use keyring::Entry;
use thiserror::Error;
use tracing::debug;

use super::RefreshToken;

/// Keychain service name; scopes the entry to this application
const SERVICE_NAME: &str = "farmconnect";

/// Key the long-lived credential is stored under
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential encryption failed: {0}")]
    Crypto(String),

    #[error("Credential data is corrupt: {0}")]
    Corrupt(String),

    #[error("Credential store task failed: {0}")]
    Task(String),

    #[error("{0} must be set to use the encrypted credential file")]
    MissingPassphrase(&'static str),
}

/// Secure, app-scoped storage for the long-lived credential.
///
/// Holds at most one value. `save` overwrites in one step and `delete`
/// on an empty store succeeds.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<RefreshToken>, StoreError>;

    fn save(&self, token: &RefreshToken) -> Result<(), StoreError>;

    fn delete(&self) -> Result<(), StoreError>;
}

/// Credential store backed by the OS keychain
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a different keychain service name (separate installs, testing)
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, REFRESH_TOKEN_KEY)?)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn load(&self) -> Result<Option<RefreshToken>, StoreError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(RefreshToken::new(token))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, token: &RefreshToken) -> Result<(), StoreError> {
        self.entry()?.set_password(token.as_str())?;
        debug!(service = %self.service, "Refresh token stored in keychain");
        Ok(())
    }

    fn delete(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Credential store that lives only as long as the process.
/// Used for ephemeral runs and as the test double.
#[derive(Default)]
pub struct MemoryStore {
    token: Mutex<Option<RefreshToken>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(RefreshToken::new(token))),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<RefreshToken>> {
        // A poisoned slot still holds a coherent Option
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<RefreshToken>, StoreError> {
        Ok(self.slot().clone())
    }

    fn save(&self, token: &RefreshToken) -> Result<(), StoreError> {
        *self.slot() = Some(token.clone());
        Ok(())
    }

    fn delete(&self) -> Result<(), StoreError> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::with_token("rt_old");
        store.save(&RefreshToken::new("rt_new")).unwrap();
        assert_eq!(store.load().unwrap(), Some(RefreshToken::new("rt_new")));
    }

    #[test]
    fn test_memory_store_delete_is_idempotent() {
        let store = MemoryStore::new();
        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());

        store.save(&RefreshToken::new("rt")).unwrap();
        store.delete().unwrap();
        store.delete().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
