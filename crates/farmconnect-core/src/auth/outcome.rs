//! Typed results of session operations.
//!
//! Screens match on these instead of inspecting error strings.

use thiserror::Error;

use super::credentials::StoreError;
use super::session::{SessionInfo, SessionState};
use crate::api::{ApiError, FailureKind};

/// A session was created by login, registration or renewal
#[derive(Debug)]
pub struct SessionEstablished {
    pub session: SessionInfo,
    /// Set when the new refresh token could not be persisted.
    /// The in-memory session is still valid for this run.
    pub storage_error: Option<StoreError>,
}

impl SessionEstablished {
    pub fn credential_persisted(&self) -> bool {
        self.storage_error.is_none()
    }
}

pub type LoginOutcome = SessionEstablished;

/// Why a start-up renewal ended signed out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// Nothing stored; no request was made
    NoStoredCredential,
    /// The service refused the stored token
    Rejected(String),
    /// The request failed or timed out
    Transport(String),
    /// The credential store could not be read
    StorageUnavailable(String),
}

impl From<&ApiError> for UnauthenticatedReason {
    fn from(error: &ApiError) -> Self {
        match error.kind() {
            FailureKind::Transport => UnauthenticatedReason::Transport(error.to_string()),
            FailureKind::Rejected => UnauthenticatedReason::Rejected(error.to_string()),
        }
    }
}

#[derive(Debug)]
pub enum RenewOutcome {
    Authenticated(SessionEstablished),
    Unauthenticated(UnauthenticatedReason),
}

impl RenewOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, RenewOutcome::Authenticated(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum LogoutOutcome {
    /// Server invalidated the token and local state was cleared
    Completed,
    /// Server call failed; local state was cleared anyway
    CompletedLocally,
    /// No session or stored token; nothing was sent
    AlreadySignedOut,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        state: SessionState,
        operation: &'static str,
    },

    #[error("Already logged in - log out first")]
    AlreadyAuthenticated,

    #[error("Please wait {remaining_secs}s before requesting another code")]
    ResendTooSoon { remaining_secs: i64 },
}

impl SessionError {
    /// Message suitable for showing to the farmer
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(ApiError::Unauthorized) => {
                "The OTP you entered is incorrect. Please try again.".to_string()
            }
            SessionError::Api(ApiError::RateLimited) => {
                "Too many attempts. Please wait before trying again.".to_string()
            }
            SessionError::Api(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            SessionError::Api(ApiError::NetworkError(_)) => {
                "Please check your internet connection and try again.".to_string()
            }
            SessionError::Api(ApiError::Rejected(message)) => message.clone(),
            SessionError::Api(_) => "Server error occurred. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}
