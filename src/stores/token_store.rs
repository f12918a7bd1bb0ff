use crate::models::user::UserId;
use crate::security::token::{generate_token, token_digest};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRecord {
    pub user_id: UserId,
    pub issued_at: i64,
}

/// A freshly minted token, not yet stored
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub digest: String,
    pub record: TokenRecord,
}

impl IssuedToken {
    pub fn mint(user_id: UserId, issued_at: i64) -> Self {
        let token = generate_token();
        let digest = token_digest(&token);
        Self {
            token,
            digest,
            record: TokenRecord { user_id, issued_at },
        }
    }
}

/// Issued bearer tokens, keyed by their SHA-256 digest.
///
/// A record only names the user. Roles are looked up fresh on every request.
pub struct TokenStore {
    tokens: DashMap<String, TokenRecord>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    /// Make `digest` valid for the record's user
    pub fn insert(&self, digest: String, record: TokenRecord) {
        self.tokens.insert(digest, record);
    }

    pub fn resolve(&self, token: &str) -> Option<TokenRecord> {
        self.tokens.get(&token_digest(token)).map(|entry| *entry.value())
    }

    pub fn revoke_digest(&self, digest: &str) -> bool {
        self.tokens.remove(digest).is_some()
    }

    /// Drop every token belonging to `user_id`, returning their digests
    pub fn revoke_all_for_user(&self, user_id: &UserId) -> Vec<String> {
        let digests: Vec<String> = self
            .tokens
            .iter()
            .filter(|entry| entry.value().user_id == *user_id)
            .map(|entry| entry.key().clone())
            .collect();

        for digest in &digests {
            self.tokens.remove(digest);
        }
        digests
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
