use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{AccessToken, RefreshToken};
use crate::api::CredentialGrant;
use crate::models::Farmer;

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    Renewing,
    Authenticated,
    Unauthenticated,
    LoggingOut,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Uninitialized, Renewing | Authenticated | Unauthenticated | LoggingOut)
                | (Renewing, Authenticated | Unauthenticated)
                | (Unauthenticated, Renewing | Authenticated | LoggingOut)
                | (Authenticated, LoggingOut)
                | (LoggingOut, Unauthenticated)
        )
    }

    pub fn is_authenticated(self) -> bool {
        self == SessionState::Authenticated
    }

    /// True while a renewal or logout request is outstanding
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Renewing | SessionState::LoggingOut)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "Uninitialized"),
            SessionState::Renewing => write!(f, "Renewing"),
            SessionState::Authenticated => write!(f, "Authenticated"),
            SessionState::Unauthenticated => write!(f, "Unauthenticated"),
            SessionState::LoggingOut => write!(f, "Logging out"),
        }
    }
}

/// Live session held in memory by the manager
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub farmer: Farmer,
    pub established_at: DateTime<Utc>,
}

impl From<CredentialGrant> for Session {
    fn from(grant: CredentialGrant) -> Self {
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            farmer: grant.farmer,
            established_at: Utc::now(),
        }
    }
}

/// Snapshot of an authenticated session handed to the screens.
/// Carries no long-lived credential.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub farmer: Farmer,
    pub access_token: AccessToken,
    pub established_at: DateTime<Utc>,
}

impl Session {
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            farmer: self.farmer.clone(),
            access_token: self.access_token.clone(),
            established_at: self.established_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    const ALL: [SessionState; 5] = [Uninitialized, Renewing, Authenticated, Unauthenticated, LoggingOut];

    #[test]
    fn test_legal_transitions() {
        assert!(Uninitialized.can_transition_to(Renewing));
        assert!(Renewing.can_transition_to(Authenticated));
        assert!(Renewing.can_transition_to(Unauthenticated));
        assert!(Authenticated.can_transition_to(LoggingOut));
        assert!(LoggingOut.can_transition_to(Unauthenticated));
        assert!(Unauthenticated.can_transition_to(Authenticated));
    }

    #[test]
    fn test_no_mid_session_renewal() {
        assert!(!Authenticated.can_transition_to(Renewing));
        assert!(!Authenticated.can_transition_to(Unauthenticated));
        assert!(!LoggingOut.can_transition_to(Authenticated));
        assert!(!Renewing.can_transition_to(LoggingOut));
    }

    #[test]
    fn test_nothing_returns_to_uninitialized() {
        for state in ALL {
            assert!(!state.can_transition_to(Uninitialized), "{state} -> Uninitialized");
        }
    }

    #[test]
    fn test_busy_states() {
        let busy: Vec<_> = ALL.into_iter().filter(|s| s.is_busy()).collect();
        assert_eq!(busy, vec![Renewing, LoggingOut]);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&LoggingOut).unwrap(), r#""logging_out""#);
    }
}
