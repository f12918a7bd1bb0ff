// Owner-only profile operations

use crate::core::error::AuthError;
use crate::core::state::AppState;
use crate::guard::server::AuthUser;
use crate::models::user::{ProfilePatch, PublicUser};
use crate::utils::time::next_timestamp_millis;
use crate::wal::wal::WalOperation;
use anyhow::Context;
use tracing::info;

pub fn get_profile(state: &AppState, caller: &AuthUser) -> Result<PublicUser, AuthError> {
    state
        .users
        .get(&caller.id)
        .map(|user| user.to_public())
        .ok_or(AuthError::Unauthenticated)
}

/// Apply `patch` to the caller's own record. An empty patch writes nothing.
pub fn update_profile(
    state: &AppState,
    caller: &AuthUser,
    patch: ProfilePatch,
) -> Result<PublicUser, AuthError> {
    let outcome = state.users.update(&caller.id, |user| -> Result<PublicUser, AuthError> {
        if patch.is_empty() {
            return Ok(user.to_public());
        }

        let updated_at = next_timestamp_millis(user.updated_at);
        state
            .wal
            .log_operation(WalOperation::UpdateProfile {
                id: user.id,
                patch: patch.clone(),
                updated_at,
            })
            .context("Failed to persist profile update")?;

        patch.apply_to(user);
        user.updated_at = updated_at;
        Ok(user.to_public())
    });

    let user = outcome.ok_or(AuthError::Unauthenticated)??;
    info!(user_id = %user.id, "Profile updated");
    Ok(user)
}

/// Delete the caller's account and revoke all of its tokens
pub fn delete_profile(state: &AppState, caller: &AuthUser) -> Result<(), AuthError> {
    if state.users.get(&caller.id).is_none() {
        return Err(AuthError::Unauthenticated);
    }

    state
        .wal
        .log_operation(WalOperation::DeleteUser { id: caller.id })
        .context("Failed to persist user deletion")?;

    state.users.remove(&caller.id);
    let revoked = state.tokens.revoke_all_for_user(&caller.id);

    info!(user_id = %caller.id, tokens_revoked = revoked.len(), "User deleted");
    Ok(())
}
