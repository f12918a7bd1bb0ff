//! Client-side session context.
//!
//! Holds the token and the resolved profile for one browser-like client.
//! Token and user are only ever written together, under one lock, so readers
//! never see a token from one login paired with a user from another.
//!
//! Two counters order concurrent work:
//! * `epoch` is bumped by `logout` and by every committed sign-in or deletion.
//!   An operation that started under an older epoch drops its result.
//! * `init_seq` numbers `initialize` calls; only the latest may commit.

use crate::client::api::AuthApi;
use crate::client::storage::TokenStorage;
use crate::core::error::ClientError;
use crate::models::api::{LoginRequest, RegisterRequest};
use crate::models::user::{ProfilePatch, PublicUser};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<PublicUser>,
    /// True exactly when both `token` and `user` are present
    pub is_authenticated: bool,
    pub loading: bool,
    /// Last user-facing error message
    pub error: Option<String>,
}

impl SessionState {
    fn starting() -> Self {
        Self {
            loading: true,
            ..Self::signed_out()
        }
    }

    fn signed_out() -> Self {
        Self {
            token: None,
            user: None,
            is_authenticated: false,
            loading: false,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::signed_out()
        }
    }

    fn signed_in(token: String, user: PublicUser) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            is_authenticated: true,
            loading: false,
            error: None,
        }
    }

    fn is_consistent(&self) -> bool {
        self.is_authenticated == (self.token.is_some() && self.user.is_some())
    }
}

pub struct SessionContext<A, S> {
    api: A,
    storage: S,
    state: Mutex<SessionState>,
    epoch: AtomicU64,
    init_seq: AtomicU64,
    /// Serializes login, register and delete
    op_lock: tokio::sync::Mutex<()>,
}

impl<A: AuthApi, S: TokenStorage> SessionContext<A, S> {
    pub fn new(api: A, storage: S) -> Self {
        Self {
            api,
            storage,
            state: Mutex::new(SessionState::starting()),
            epoch: AtomicU64::new(0),
            init_seq: AtomicU64::new(0),
            op_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn token(&self) -> Option<String> {
        self.lock_state().token.clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin(&self) {
        let mut state = self.lock_state();
        state.loading = true;
        state.error = None;
    }

    fn clear_storage(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear persisted token");
        }
    }

    /// Restore the session from the persisted token.
    ///
    /// Any failure (unknown token, deleted user, network) drops the persisted
    /// token and leaves the session signed out with the error recorded.
    pub async fn initialize(&self) {
        let seq = self.init_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.begin();

        let token = match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted token");
                None
            }
        };

        let Some(token) = token else {
            let mut state = self.lock_state();
            if self.is_latest_init(seq, epoch) {
                *state = SessionState::signed_out();
            }
            return;
        };

        let result = self.api.get_profile(&token).await;

        let mut state = self.lock_state();
        if !self.is_latest_init(seq, epoch) {
            debug!(seq, "Discarding stale session restore");
            return;
        }

        match result {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                *state = SessionState::signed_in(token, user);
            }
            Err(e) => {
                warn!(error = %e, "Persisted token rejected, signing out");
                self.clear_storage();
                *state = SessionState::failed(e.user_message());
            }
        }
    }

    fn is_latest_init(&self, seq: u64, epoch: u64) -> bool {
        self.init_seq.load(Ordering::SeqCst) == seq && self.epoch.load(Ordering::SeqCst) == epoch
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<PublicUser, ClientError> {
        let _op = self.op_lock.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.begin();

        let result = self.sign_in(email, password).await;
        self.commit_sign_in(epoch, result)
    }

    /// Create an account, then sign in with the same credentials
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<PublicUser, ClientError> {
        let _op = self.op_lock.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.begin();

        let req = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let result = match self.api.register(&req).await {
            Ok(_) => self.sign_in(email, password).await,
            Err(e) => Err(e),
        };
        self.commit_sign_in(epoch, result)
    }

    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, PublicUser), ClientError> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let token = self.api.login(&req).await?;
        let user = self.api.get_profile(&token).await?;
        Ok((token, user))
    }

    fn commit_sign_in(
        &self,
        epoch: u64,
        result: Result<(String, PublicUser), ClientError>,
    ) -> Result<PublicUser, ClientError> {
        let mut state = self.lock_state();

        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Sign-in finished after the session changed, discarding");
            return Err(ClientError::Superseded);
        }

        let outcome = result.and_then(|(token, user)| {
            self.storage.save(&token)?;
            Ok((token, user))
        });

        match outcome {
            Ok((token, user)) => {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                info!(user_id = %user.id, "Signed in");
                *state = SessionState::signed_in(token, user.clone());
                Ok(user)
            }
            Err(e) => {
                self.epoch.fetch_add(1, Ordering::SeqCst);
                self.clear_storage();
                *state = SessionState::failed(e.user_message());
                Err(e)
            }
        }
    }

    /// Local sign-out. Wins over any sign-in still in flight.
    pub fn logout(&self) {
        let mut state = self.lock_state();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.clear_storage();
        *state = SessionState::signed_out();
        info!("Signed out");
    }

    /// Save profile edits. On failure the cached user is left as it was.
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<PublicUser, ClientError> {
        let (token, epoch) = {
            let state = self.lock_state();
            let token = state.token.clone().ok_or(ClientError::NotAuthenticated)?;
            (token, self.epoch.load(Ordering::SeqCst))
        };

        let result = self.api.update_profile(&token, patch).await;

        let mut state = self.lock_state();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return Err(ClientError::Superseded);
        }

        match result {
            Ok(updated) => {
                // The server's record is authoritative, role included
                state.user = Some(updated.clone());
                state.error = None;
                Ok(updated)
            }
            Err(e) => {
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Delete the account server-side, then sign out locally
    pub async fn delete_profile(&self) -> Result<(), ClientError> {
        let _op = self.op_lock.lock().await;
        let token = self.token().ok_or(ClientError::NotAuthenticated)?;

        match self.api.delete_profile(&token).await {
            Ok(()) => {
                self.logout();
                Ok(())
            }
            Err(e) => {
                self.lock_state().error = Some(e.user_message());
                Err(e)
            }
        }
    }

    /// Current state. A state that breaks the authenticated invariant is
    /// reset to signed out before it is returned.
    pub fn snapshot(&self) -> SessionState {
        let mut state = self.lock_state();

        if !state.is_consistent() {
            error!(
                is_authenticated = state.is_authenticated,
                has_token = state.token.is_some(),
                has_user = state.user.is_some(),
                "Inconsistent session state, forcing sign-out"
            );
            self.epoch.fetch_add(1, Ordering::SeqCst);
            self.clear_storage();
            *state = SessionState::signed_out();
        }

        state.clone()
    }
}
