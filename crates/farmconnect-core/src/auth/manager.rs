//! Session lifecycle: silent renewal, interactive login, logout.
//!
//! `SessionManager` is constructed explicitly and handed to whatever needs
//! the session; there is no global instance. Every state-changing
//! operation holds the session lock from start to finish, so operations
//! run one at a time and each sees the state the previous one left.
//!
//! The refresh token is the only value that reaches the credential store.
//! The access token and farmer profile stay in memory and are replaced
//! wholesale from each server response.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::credentials::{CredentialStore, StoreError};
use super::otp::ResendCooldown;
use super::outcome::{
    LoginOutcome, LogoutOutcome, RenewOutcome, SessionError, SessionEstablished,
    UnauthenticatedReason,
};
use super::session::{Session, SessionInfo, SessionState};
use super::{AccessToken, RefreshToken};
use crate::api::{ApiError, AuthClient, CredentialGrant};
use crate::models::{Farmer, Registration};
use crate::utils::{is_valid_otp, is_valid_phone, mask_phone, normalize_phone};

pub struct SessionManager {
    client: AuthClient,
    store: Arc<dyn CredentialStore>,
    session: Mutex<Option<Session>>,
    cooldown: Mutex<ResendCooldown>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    pub fn new(client: AuthClient, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Uninitialized);
        Self {
            client,
            store,
            session: Mutex::new(None),
            cooldown: Mutex::new(ResendCooldown::new()),
            state,
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receive every state change; screens route on these
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub async fn info(&self) -> Option<SessionInfo> {
        self.session.lock().await.as_ref().map(Session::info)
    }

    pub async fn farmer(&self) -> Option<Farmer> {
        self.session.lock().await.as_ref().map(|s| s.farmer.clone())
    }

    /// Short-lived credential for authorizing API calls
    pub async fn access_token(&self) -> Option<AccessToken> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    // =========================================================================
    // Silent renewal
    // =========================================================================

    /// Re-establish the session from the stored refresh token at start-up.
    ///
    /// Any renewal failure clears the stored token; a flaky network and a
    /// revoked token both end in `Unauthenticated`.
    pub async fn restore(&self) -> Result<RenewOutcome, SessionError> {
        let mut slot = self.session.lock().await;

        let current = self.state();
        if current == SessionState::Authenticated {
            return Err(SessionError::InvalidState {
                state: current,
                operation: "restore",
            });
        }

        self.set_state(SessionState::Renewing);
        let _unwind = UnwindOnDrop(&self.state);

        let stored = match self.store_load().await {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                info!("No stored refresh token; login required");
                *slot = None;
                self.set_state(SessionState::Unauthenticated);
                return Ok(RenewOutcome::Unauthenticated(
                    UnauthenticatedReason::NoStoredCredential,
                ));
            }
            Err(e) => {
                error!(error = %e, "Failed to read stored refresh token");
                *slot = None;
                self.set_state(SessionState::Unauthenticated);
                return Ok(RenewOutcome::Unauthenticated(
                    UnauthenticatedReason::StorageUnavailable(e.to_string()),
                ));
            }
        };

        match self.client.refresh(&stored).await {
            Ok(grant) => {
                let established = self.install(&mut slot, grant).await;
                info!(
                    farmer = %established.session.farmer.greeting_name(),
                    "Session renewed"
                );
                Ok(RenewOutcome::Authenticated(established))
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Session renewal failed; discarding stored token");
                self.discard_stored().await;
                *slot = None;
                self.set_state(SessionState::Unauthenticated);
                Ok(RenewOutcome::Unauthenticated(UnauthenticatedReason::from(&e)))
            }
        }
    }

    // =========================================================================
    // One-time codes
    // =========================================================================

    /// Text a login code to `phone`
    pub async fn request_login_code(&self, phone: &str) -> Result<(), SessionError> {
        let phone = Self::checked_phone(phone)?;
        let mut cooldown = self.cooldown.lock().await;
        Self::check_cooldown(&cooldown, &phone)?;

        self.client.send_login_code(&phone).await?;
        cooldown.record(&phone, Utc::now());
        info!(phone = %mask_phone(&phone), "Login code sent");
        Ok(())
    }

    /// Text a registration code to `phone`
    pub async fn request_registration_code(&self, phone: &str) -> Result<(), SessionError> {
        let phone = Self::checked_phone(phone)?;
        let mut cooldown = self.cooldown.lock().await;
        Self::check_cooldown(&cooldown, &phone)?;

        self.client.send_registration_code(&phone).await?;
        cooldown.record(&phone, Utc::now());
        info!(phone = %mask_phone(&phone), "Registration code sent");
        Ok(())
    }

    // =========================================================================
    // Interactive login
    // =========================================================================

    /// Exchange a one-time code for a session
    pub async fn login(&self, phone: &str, code: &str) -> Result<LoginOutcome, SessionError> {
        let phone = Self::checked_phone(phone)?;
        let code = code.trim();
        if !is_valid_otp(code) {
            return Err(SessionError::InvalidInput(
                "Please enter the complete 6-digit OTP".to_string(),
            ));
        }

        let mut slot = self.session.lock().await;
        self.ensure_signed_out()?;

        let result = self.client.login(&phone, code).await;
        self.complete_sign_in(&mut slot, result, "Login").await
    }

    /// Create an account and sign in to it
    pub async fn register(&self, mut registration: Registration) -> Result<LoginOutcome, SessionError> {
        registration.phone_number = normalize_phone(&registration.phone_number);
        registration.code = registration.code.trim().to_string();
        registration
            .validate()
            .map_err(SessionError::InvalidInput)?;

        let mut slot = self.session.lock().await;
        self.ensure_signed_out()?;

        let result = self.client.register(&registration).await;
        self.complete_sign_in(&mut slot, result, "Registration").await
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// Clear all local session state, then invalidate the refresh token
    /// remotely (best-effort). Always ends `Unauthenticated`, even when the
    /// returned future is dropped before the remote call finishes.
    pub async fn logout(&self) -> LogoutOutcome {
        let mut slot = self.session.lock().await;

        let token = match slot.as_ref() {
            Some(session) => Some(session.refresh_token.clone()),
            None => match self.store_load().await {
                Ok(token) => token.filter(|t| !t.is_empty()),
                Err(e) => {
                    warn!(error = %e, "Could not read stored refresh token for logout");
                    None
                }
            },
        };

        let Some(token) = token else {
            debug!("Logout requested with no session");
            self.discard_stored().await;
            self.set_state(SessionState::Unauthenticated);
            return LogoutOutcome::AlreadySignedOut;
        };

        *slot = None;
        self.set_state(SessionState::LoggingOut);
        let _unwind = UnwindOnDrop(&self.state);

        // Nothing usable remains locally once the remote call starts
        self.discard_stored().await;
        self.cooldown.lock().await.reset();

        let remote = self.client.logout(&token).await;
        self.set_state(SessionState::Unauthenticated);

        match remote {
            Ok(()) => {
                info!("Logged out");
                LogoutOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "Remote logout failed; session cleared locally");
                LogoutOutcome::CompletedLocally
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn set_state(&self, next: SessionState) {
        let current = self.state();
        if current == next {
            return;
        }
        debug_assert!(
            current.can_transition_to(next),
            "illegal session transition {current} -> {next}"
        );
        debug!(from = %current, to = %next, "Session state change");
        self.state.send_replace(next);
    }

    fn ensure_signed_out(&self) -> Result<(), SessionError> {
        if self.state().is_authenticated() {
            return Err(SessionError::AlreadyAuthenticated);
        }
        Ok(())
    }

    fn checked_phone(phone: &str) -> Result<String, SessionError> {
        let phone = normalize_phone(phone);
        if !is_valid_phone(&phone) {
            return Err(SessionError::InvalidInput(
                "Please enter a valid 10-digit phone number".to_string(),
            ));
        }
        Ok(phone)
    }

    fn check_cooldown(cooldown: &ResendCooldown, phone: &str) -> Result<(), SessionError> {
        match cooldown.remaining(phone, Utc::now()) {
            Some(remaining_secs) => Err(SessionError::ResendTooSoon { remaining_secs }),
            None => Ok(()),
        }
    }

    async fn complete_sign_in(
        &self,
        slot: &mut Option<Session>,
        result: Result<CredentialGrant, ApiError>,
        action: &'static str,
    ) -> Result<LoginOutcome, SessionError> {
        match result {
            Ok(grant) => {
                let established = self.install(slot, grant).await;
                self.cooldown.lock().await.reset();
                info!(
                    farmer = %established.session.farmer.greeting_name(),
                    "{} successful",
                    action
                );
                Ok(established)
            }
            Err(e) => {
                error!(error = %e, "{} failed", action);
                self.set_state(SessionState::Unauthenticated);
                Err(e.into())
            }
        }
    }

    /// Persist the new refresh token and swap in the new session as one
    /// step from the caller's point of view.
    async fn install(&self, slot: &mut Option<Session>, grant: CredentialGrant) -> SessionEstablished {
        let storage_error = match self.store_save(grant.refresh_token.clone()).await {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "Failed to persist refresh token");
                Some(e)
            }
        };

        let session = Session::from(grant);
        let info = session.info();
        *slot = Some(session);
        self.set_state(SessionState::Authenticated);

        SessionEstablished {
            session: info,
            storage_error,
        }
    }

    async fn discard_stored(&self) {
        if let Err(e) = self.store_delete().await {
            error!(error = %e, "Failed to delete stored refresh token");
        }
    }

    async fn store_load(&self) -> Result<Option<RefreshToken>, StoreError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn store_save(&self, token: RefreshToken) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.save(&token))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn store_delete(&self) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.delete())
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Returns a manager left in `Renewing` or `LoggingOut` to `Unauthenticated`
/// when the operation that entered that state is dropped mid-flight.
struct UnwindOnDrop<'a>(&'a watch::Sender<SessionState>);

impl Drop for UnwindOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if !state.is_busy() {
                return false;
            }
            warn!(from = %state, "Session operation cancelled; signing out locally");
            *state = SessionState::Unauthenticated;
            true
        });
    }
}
