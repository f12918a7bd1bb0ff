use tracing::{debug, info};

use crate::core::state::AppState;
use crate::stores::token_store::TokenRecord;
use crate::wal::wal::WalOperation;

// this runs at boot time, before the listener is bound
pub fn apply_wal_operations(state: &AppState, operations: &[WalOperation]) {
    let mut skipped = 0usize;

    for op in operations {
        let applied = match op {
            WalOperation::CreateUser { user } => {
                state.users.restore(user.clone());
                true
            }
            WalOperation::UpdateProfile { id, patch, updated_at } => state
                .users
                .update(id, |user| {
                    patch.apply_to(user);
                    user.updated_at = *updated_at;
                })
                .is_some(),
            WalOperation::ChangeRole { id, role, updated_at } => state
                .users
                .update(id, |user| {
                    user.role = *role;
                    user.updated_at = *updated_at;
                })
                .is_some(),
            WalOperation::DeleteUser { id } => {
                state.tokens.revoke_all_for_user(id);
                state.users.remove(id).is_some()
            }
            WalOperation::IssueToken { digest, user_id, issued_at } => {
                if state.users.get(user_id).is_some() {
                    state.tokens.insert(
                        digest.clone(),
                        TokenRecord {
                            user_id: *user_id,
                            issued_at: *issued_at,
                        },
                    );
                    true
                } else {
                    false
                }
            }
            WalOperation::RevokeToken { digest } => state.tokens.revoke_digest(digest),
        };

        if !applied {
            debug!(operation = ?op, "WAL entry refers to missing record, skipped");
            skipped += 1;
        }
    }

    info!(
        operations = operations.len(),
        skipped,
        users = state.users.len(),
        tokens = state.tokens.len(),
        "WAL operations applied"
    );
}
