//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionManager`: the session lifecycle (renew, login, register, logout)
//! - `CredentialStore`: secure storage for the long-lived refresh token,
//!   with keychain, encrypted-file and in-memory backends
//! - `AccessToken` / `RefreshToken`: the two credentials, with redacted
//!   `Debug` output
//!
//! Only the refresh token is ever persisted. The access token lives for
//! the life of the process.

pub mod credentials;
pub mod encrypted;
pub mod manager;
pub mod otp;
pub mod outcome;
pub mod session;
pub mod tokens;

pub use credentials::{CredentialStore, KeyringStore, MemoryStore, StoreError};
pub use encrypted::EncryptedFileStore;
pub use manager::SessionManager;
pub use outcome::{
    LoginOutcome, LogoutOutcome, RenewOutcome, SessionError, SessionEstablished,
    UnauthenticatedReason,
};
pub use session::{SessionInfo, SessionState};
pub use tokens::{AccessToken, RefreshToken};
