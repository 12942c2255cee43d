//! Encrypted-at-rest credential file.
//!
//! For hosts without a usable keychain. The refresh token is sealed with
//! XChaCha20-Poly1305 under a key derived by Argon2 from a passphrase
//! supplied by the user. Nothing on disk is enough to derive the key.
//! Every write uses a fresh salt and nonce and lands via rename, so
//! readers see the old or the new value.

use std::path::{Path, PathBuf};

use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::{CredentialStore, StoreError, REFRESH_TOKEN_KEY};
use super::RefreshToken;

const VERSION: u8 = 1;
const SALT_SIZE: usize = 16;
const XNONCE_SIZE: usize = 24;
const KEY_SIZE: usize = 32;

/// Environment variable holding the file passphrase
pub const PASSPHRASE_ENV: &str = "FARMCONNECT_STORE_PASSPHRASE";

#[derive(Serialize, Deserialize)]
struct EncryptedFile {
    version: u8,
    salt: [u8; SALT_SIZE],
    nonce: [u8; XNONCE_SIZE],
    ciphertext: Vec<u8>,
}

pub struct EncryptedFileStore {
    path: PathBuf,
    passphrase: String,
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Open the store with the passphrase from `FARMCONNECT_STORE_PASSPHRASE`.
    /// Fails when the variable is unset or blank.
    pub fn from_env(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::with_passphrase(path, std::env::var(PASSPHRASE_ENV).ok())
    }

    fn with_passphrase(
        path: impl Into<PathBuf>,
        passphrase: Option<String>,
    ) -> Result<Self, StoreError> {
        match passphrase {
            Some(passphrase) if !passphrase.trim().is_empty() => Ok(Self::new(path, passphrase)),
            _ => Err(StoreError::MissingPassphrase(PASSPHRASE_ENV)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn derive_key(&self, salt: &[u8]) -> Result<[u8; KEY_SIZE], StoreError> {
        let mut key = [0u8; KEY_SIZE];
        Argon2::default()
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|e| StoreError::Crypto(e.to_string()))?;
        Ok(key)
    }

    fn seal(&self, token: &RefreshToken) -> Result<EncryptedFile, StoreError> {
        let mut rng = rand::thread_rng();
        let mut salt = [0u8; SALT_SIZE];
        let mut nonce = [0u8; XNONCE_SIZE];
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let key = self.derive_key(&salt)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: token.as_str().as_bytes(),
                    aad: REFRESH_TOKEN_KEY.as_bytes(),
                },
            )
            .map_err(|_| StoreError::Crypto("encryption failed".to_string()))?;

        Ok(EncryptedFile {
            version: VERSION,
            salt,
            nonce,
            ciphertext,
        })
    }

    fn open(&self, file: &EncryptedFile) -> Result<RefreshToken, StoreError> {
        if file.version != VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported version {} (expected {})",
                file.version, VERSION
            )));
        }

        let key = self.derive_key(&file.salt)?;
        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(
                XNonce::from_slice(&file.nonce),
                Payload {
                    msg: &file.ciphertext,
                    aad: REFRESH_TOKEN_KEY.as_bytes(),
                },
            )
            .map_err(|_| StoreError::Crypto("wrong passphrase or tampered file".to_string()))?;

        let token = String::from_utf8(plaintext)
            .map_err(|_| StoreError::Corrupt("token is not UTF-8".to_string()))?;
        Ok(RefreshToken::new(token))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStore for EncryptedFileStore {
    fn load(&self) -> Result<Option<RefreshToken>, StoreError> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let file: EncryptedFile =
            serde_json::from_slice(&contents).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        self.open(&file).map(Some)
    }

    fn save(&self, token: &RefreshToken) -> Result<(), StoreError> {
        let sealed = self.seal(token)?;
        let contents =
            serde_json::to_vec(&sealed).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, contents)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = ?self.path, "Refresh token written to encrypted file");
        Ok(())
    }

    fn delete(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir, passphrase: &str) -> EncryptedFileStore {
        EncryptedFileStore::new(dir.path().join("credentials.enc"), passphrase)
    }

    #[test]
    fn test_passphrase_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.enc");

        for missing in [None, Some(String::new()), Some("   ".to_string())] {
            let err = EncryptedFileStore::with_passphrase(&path, missing).err().unwrap();
            assert!(matches!(err, StoreError::MissingPassphrase(PASSPHRASE_ENV)));
            assert!(err.to_string().contains(PASSPHRASE_ENV));
        }

        let store = EncryptedFileStore::with_passphrase(&path, Some("s3cret".to_string())).unwrap();
        store.save(&RefreshToken::new("rt")).unwrap();
        assert_eq!(store.load().unwrap(), Some(RefreshToken::new("rt")));
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(&dir, "pass").load().unwrap().is_none());
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pass");

        store.save(&RefreshToken::new("rt_abc")).unwrap();
        store.save(&RefreshToken::new("rt_xyz")).unwrap();

        assert_eq!(store.load().unwrap(), Some(RefreshToken::new("rt_xyz")));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_file_does_not_contain_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pass");
        store.save(&RefreshToken::new("rt_plaintext_marker")).unwrap();

        let raw = std::fs::read(store.path()).unwrap();
        let haystack = String::from_utf8_lossy(&raw);
        assert!(!haystack.contains("rt_plaintext_marker"));
    }

    #[test]
    fn test_wrong_passphrase_fails() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir, "right").save(&RefreshToken::new("rt")).unwrap();

        let err = store_in(&dir, "wrong").load().unwrap_err();
        assert!(matches!(err, StoreError::Crypto(_)));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pass");
        std::fs::write(store.path(), b"not json").unwrap();
        assert!(matches!(store.load().unwrap_err(), StoreError::Corrupt(_)));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir, "pass");
        store.delete().unwrap();

        store.save(&RefreshToken::new("rt")).unwrap();
        store.delete().unwrap();
        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_none());
    }
}
