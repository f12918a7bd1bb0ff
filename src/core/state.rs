// Application state (AppState)

use crate::core::config::Config;
use crate::security::rate_limiter::RateLimiter;
use crate::stores::{token_store::TokenStore, user_store::UserStore};
use crate::wal::wal::Wal;
use std::sync::Arc;

/// Shared application state
///
/// Everything a request handler touches. The stores are the only shared
/// mutable state between requests; each is internally synchronized.
#[derive(Clone)]
pub struct AppState {
    /// User records
    pub users: Arc<UserStore>,

    /// Issued bearer tokens
    pub tokens: Arc<TokenStore>,

    /// Login attempts per normalized email
    pub login_limiter: Arc<RateLimiter<String>>,

    /// Write-Ahead Log for persistence
    pub wal: Arc<Wal>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, wal: Wal) -> Self {
        let login_limiter = Arc::new(RateLimiter::new(config.auth.login_attempts_per_minute));

        Self {
            users: Arc::new(UserStore::new()),
            tokens: Arc::new(TokenStore::new()),
            login_limiter,
            wal: Arc::new(wal),
            config: Arc::new(config),
        }
    }
}
