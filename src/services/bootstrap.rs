// One-time super_admin provisioning

use crate::core::config::BootstrapConfig;
use crate::core::state::AppState;
use crate::models::role::Role;
use crate::models::user::{PublicUser, User};
use crate::security::password::hash_password;
use crate::stores::user_store::InsertError;
use crate::utils::time::current_timestamp_millis;
use crate::validation::registration::normalize_email;
use crate::wal::wal::WalOperation;
use anyhow::{anyhow, Context, Result};
use tracing::info;

#[derive(Debug)]
pub enum BootstrapOutcome {
    Created(PublicUser),
    /// A super_admin exists; nothing was written
    AlreadyProvisioned,
}

/// Create the super_admin from the seed credentials unless one already exists.
pub fn provision_super_admin(state: &AppState, seed: &BootstrapConfig) -> Result<BootstrapOutcome> {
    if state.users.any_with_role(Role::SuperAdmin) {
        info!("Super admin already exists, skipping provisioning");
        return Ok(BootstrapOutcome::AlreadyProvisioned);
    }

    let mut user = User::new(
        seed.username.trim().to_string(),
        normalize_email(&seed.email),
        hash_password(&seed.password).context("Failed to hash seed password")?,
        Role::SuperAdmin,
        current_timestamp_millis(),
    );
    user.bio = Some(seed.bio.clone());

    state
        .users
        .insert_unique_with(user.clone(), |pending| {
            state.wal.log_operation(WalOperation::CreateUser {
                user: pending.clone(),
            })
        })
        .map_err(|e| match e {
            InsertError::Taken(field) => {
                anyhow!("Seed account collides with an existing user ({:?})", field)
            }
            InsertError::Persist(e) => e.context("Failed to persist super admin"),
        })?;

    info!(user_id = %user.id, username = %user.username, "Super admin created");

    Ok(BootstrapOutcome::Created(user.to_public()))
}
