//! FarmConnect core - session lifecycle for the farmer assistant.
//!
//! This crate owns everything between the screens and the remote
//! authentication service:
//!
//! - `api`: HTTPS client for the one-time-code login, registration,
//!   renewal and logout endpoints
//! - `auth`: credential stores and the `SessionManager` state machine
//! - `models`: farmer profile and registration payloads
//! - `config`: persisted application configuration
//!
//! The long-lived credential is kept in a secure store; the short-lived
//! credential lives only inside a `SessionManager` and is never persisted.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiError, AuthClient};
pub use auth::{
    CredentialStore, LoginOutcome, LogoutOutcome, RenewOutcome, SessionError, SessionManager,
    SessionState,
};
pub use config::Config;
pub use models::{Farmer, Registration};
