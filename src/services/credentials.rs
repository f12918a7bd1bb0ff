// Credential service: registration, login and token revocation

use crate::core::error::AuthError;
use crate::core::state::AppState;
use crate::models::api::{LoginRequest, RegisterRequest};
use crate::models::role::Role;
use crate::models::user::{PublicUser, User};
use crate::security::password::{hash_password, verify_password};
use crate::security::token::token_digest;
use crate::stores::token_store::IssuedToken;
use crate::stores::user_store::{InsertError, UniqueField};
use crate::utils::time::{current_timestamp, current_timestamp_millis};
use crate::validation::registration::{normalize_email, validate_registration};
use crate::wal::wal::WalOperation;
use anyhow::Context;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Create a `client` account. Never issues a token.
///
/// The request type has no role field, so a role smuggled into the JSON body
/// is discarded before it gets here.
pub fn register(state: &AppState, req: RegisterRequest) -> Result<PublicUser, AuthError> {
    let validated = validate_registration(&req, state.config.auth.min_password_length)?;

    let password_hash = hash_password(&req.password)?;
    let user = User::new(
        validated.username,
        validated.email,
        password_hash,
        Role::Client,
        current_timestamp_millis(),
    );

    state
        .users
        .insert_unique_with(user.clone(), |pending| {
            state.wal.log_operation(WalOperation::CreateUser {
                user: pending.clone(),
            })
        })
        .map_err(|e| match e {
            InsertError::Taken(UniqueField::Username) => {
                AuthError::Conflict("Username is already taken".to_string())
            }
            InsertError::Taken(UniqueField::Email) => {
                AuthError::Conflict("Email is already registered".to_string())
            }
            InsertError::Persist(e) => AuthError::Internal(e.context("Failed to persist new user")),
        })?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(user.to_public())
}

/// Verify credentials and issue a bearer token.
///
/// Unknown email and wrong password produce the same error, and both pay for
/// one argon2 verification.
pub fn login(state: &AppState, req: LoginRequest) -> Result<String, AuthError> {
    let email = normalize_email(&req.email);

    if !state
        .login_limiter
        .check_and_increment(email.clone(), current_timestamp())
    {
        warn!(email = %email, "Login rate limit exceeded");
        return Err(AuthError::RateLimited);
    }

    let user = match state.users.find_by_email(&email) {
        Some(user) if verify_password(&user.password_hash, &req.password) => user,
        Some(user) => {
            warn!(user_id = %user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }
        None => {
            if let Some(hash) = dummy_hash() {
                verify_password(hash, &req.password);
            }
            warn!(email = %email, "Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    let issued = IssuedToken::mint(user.id, current_timestamp_millis());

    state
        .wal
        .log_operation(WalOperation::IssueToken {
            digest: issued.digest.clone(),
            user_id: issued.record.user_id,
            issued_at: issued.record.issued_at,
        })
        .context("Failed to persist issued token")?;

    state.tokens.insert(issued.digest, issued.record);
    state.login_limiter.reset(&email);

    info!(user_id = %user.id, "User logged in");

    Ok(issued.token)
}

/// Revoke one token server-side
pub fn logout(state: &AppState, token: &str) -> Result<(), AuthError> {
    let digest = token_digest(token);

    let record = state
        .tokens
        .resolve(token)
        .ok_or(AuthError::Unauthenticated)?;

    state
        .wal
        .log_operation(WalOperation::RevokeToken {
            digest: digest.clone(),
        })
        .context("Failed to persist token revocation")?;

    state.tokens.revoke_digest(&digest);

    info!(user_id = %record.user_id, "Token revoked");

    Ok(())
}

/// Hash verified against when the email is unknown
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("placeholder-password").ok())
        .as_deref()
}
