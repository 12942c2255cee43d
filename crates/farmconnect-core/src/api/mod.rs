//! REST API client module for the FarmConnect authentication service.
//!
//! This module provides the `AuthClient` for requesting one-time codes,
//! exchanging them for credentials, renewing a session from a stored
//! refresh token and invalidating it on logout.

pub mod client;
pub mod error;

pub use client::{AuthClient, CredentialGrant};
pub use error::{ApiError, FailureKind};
