// Admin user list with per-row role changes

use crate::client::api::AuthApi;
use crate::client::session::SessionContext;
use crate::client::storage::TokenStorage;
use crate::core::error::ClientError;
use crate::models::role::Role;
use crate::models::user::{PublicUser, UserId};
use dashmap::DashSet;
use std::sync::Mutex;
use tracing::{info, warn};

/// Clears a row's in-flight marker when the change finishes or is dropped
struct PendingRow<'a> {
    pending: &'a DashSet<UserId>,
    id: UserId,
}

impl Drop for PendingRow<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

#[derive(Default)]
pub struct UserManager {
    users: Mutex<Vec<PublicUser>>,
    pending: DashSet<UserId>,
}

impl UserManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> Vec<PublicUser> {
        self.rows().clone()
    }

    /// Whether a role change for `id` is still in flight
    pub fn is_changing(&self, id: &UserId) -> bool {
        self.pending.contains(id)
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<PublicUser>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn load_users<A: AuthApi, S: TokenStorage>(
        &self,
        session: &SessionContext<A, S>,
    ) -> Result<Vec<PublicUser>, ClientError> {
        let token = session.token().ok_or(ClientError::NotAuthenticated)?;
        let users = session.api().list_users(&token).await?;

        *self.rows() = users.clone();
        Ok(users)
    }

    /// Change one row's role. A second change for a row that is still
    /// pending fails with `Busy`; other rows are unaffected.
    pub async fn change_role<A: AuthApi, S: TokenStorage>(
        &self,
        session: &SessionContext<A, S>,
        id: UserId,
        role: Role,
    ) -> Result<PublicUser, ClientError> {
        let token = session.token().ok_or(ClientError::NotAuthenticated)?;

        if !self.pending.insert(id) {
            return Err(ClientError::Busy);
        }
        let _row = PendingRow {
            pending: &self.pending,
            id,
        };

        let result = session
            .api()
            .change_role(&token, &id.to_string(), role.as_str())
            .await;

        match result {
            Ok(updated) => {
                if let Some(row) = self.rows().iter_mut().find(|u| u.id == updated.id) {
                    *row = updated.clone();
                }
                info!(user_id = %id, role = %updated.role, "Role changed");
                Ok(updated)
            }
            Err(e) => {
                warn!(user_id = %id, error = %e, "Role change failed");
                Err(e)
            }
        }
    }
}
