// Role mutation workflow (super_admin only)

use crate::core::error::AuthError;
use crate::core::state::AppState;
use crate::guard::server::AuthUser;
use crate::models::role::Role;
use crate::models::user::PublicUser;
use crate::policy::roles::is_assignable;
use crate::utils::time::next_timestamp_millis;
use crate::wal::wal::WalOperation;
use anyhow::Context;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RoleChange {
    pub user: PublicUser,
    pub previous: Role,
    /// False when the target already had the requested role
    pub changed: bool,
}

/// Change `target`'s role to `desired`.
///
/// Checks, in order: caller is super_admin (Forbidden), desired role is
/// assignable (InvalidRole), target exists (NotFound), target is not a
/// super_admin (InvalidRole). The last check and the write happen under the
/// target's entry lock, so concurrent changes to one user serialize.
pub fn change_role(
    state: &AppState,
    actor: &AuthUser,
    target: &str,
    desired: &str,
) -> Result<RoleChange, AuthError> {
    if actor.role != Role::SuperAdmin {
        warn!(actor_id = %actor.id, role = %actor.role, "Role change attempted without super_admin");
        return Err(AuthError::Forbidden);
    }

    let role = Role::parse(desired)
        .filter(|role| is_assignable(*role))
        .ok_or_else(|| {
            AuthError::InvalidRole("Invalid role. Only admin and client are allowed".to_string())
        })?;

    let target_id = Uuid::parse_str(target.trim())
        .map_err(|_| AuthError::NotFound("User not found".to_string()))?;

    let outcome = state.users.update(&target_id, |user| {
        if user.role == Role::SuperAdmin {
            return Err(AuthError::InvalidRole(
                "Super admin role cannot be changed".to_string(),
            ));
        }

        let previous = user.role;
        if previous == role {
            return Ok(RoleChange {
                user: user.to_public(),
                previous,
                changed: false,
            });
        }

        let updated_at = next_timestamp_millis(user.updated_at);
        state
            .wal
            .log_operation(WalOperation::ChangeRole {
                id: user.id,
                role,
                updated_at,
            })
            .context("Failed to persist role change")?;

        user.role = role;
        user.updated_at = updated_at;

        Ok(RoleChange {
            user: user.to_public(),
            previous,
            changed: true,
        })
    });

    let change = outcome.ok_or_else(|| AuthError::NotFound("User not found".to_string()))??;

    info!(
        actor_id = %actor.id,
        target_id = %change.user.id,
        from = %change.previous,
        to = %change.user.role,
        changed = change.changed,
        "User role updated"
    );

    Ok(change)
}
