//! Server-side route guard.
//!
//! Every privileged request resolves the bearer token to a user id and then
//! reads that user's *current* role from the store. Tokens carry no role, so a
//! role change takes effect on the very next request.

use crate::core::error::AuthError;
use crate::core::state::AppState;
use crate::models::role::Role;
use crate::models::user::UserId;
use crate::policy::roles::{ADMIN_ROLES, SUPER_ADMIN_ROLES};
use crate::security::token::parse_bearer;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// An authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub role: Role,
    /// The raw bearer token presented with this request
    pub token: String,
}

/// Resolve the caller from the `Authorization` header.
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<AuthUser, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::Unauthenticated)?;

    let token = parse_bearer(header).ok_or(AuthError::Unauthenticated)?;

    let record = state.tokens.resolve(token).ok_or_else(|| {
        debug!("Unknown or revoked bearer token");
        AuthError::Unauthenticated
    })?;

    let user = state.users.get(&record.user_id).ok_or_else(|| {
        warn!(user_id = %record.user_id, "Token refers to a deleted user");
        AuthError::Unauthenticated
    })?;

    Ok(AuthUser {
        id: user.id,
        role: user.role,
        token: token.to_string(),
    })
}

/// Authorization step; only call with an already authenticated user.
pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        warn!(user_id = %user.id, role = %user.role, "Forbidden: insufficient role");
        Err(AuthError::Forbidden)
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state)
    }
}

/// Requires `admin` or `super_admin`. 401 before 403.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        authorize(&user, ADMIN_ROLES)?;
        Ok(RequireAdmin(user))
    }
}

/// Requires `super_admin`. 401 before 403.
pub struct RequireSuperAdmin(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for RequireSuperAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        authorize(&user, SUPER_ADMIN_ROLES)?;
        Ok(RequireSuperAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_support::{create_test_state, issue_token, seed_user};
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn test_missing_header_is_unauthenticated() {
        let (state, _dir) = create_test_state();
        let err = authenticate(&HeaderMap::new(), &state).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn test_unknown_token_is_unauthenticated() {
        let (state, _dir) = create_test_state();
        let err = authenticate(&bearer("deadbeef"), &state).unwrap_err();
        assert!(matches!(err, AuthError::Unauthenticated));
    }

    #[test]
    fn test_valid_token_resolves_user() {
        let (state, _dir) = create_test_state();
        let user = seed_user(&state, "alice", Role::Client);
        let token = issue_token(&state, &user);

        let auth = authenticate(&bearer(&token), &state).unwrap();
        assert_eq!(auth.id, user.id);
        assert_eq!(auth.role, Role::Client);
        assert_eq!(auth.token, token);
    }

    #[test]
    fn test_role_is_read_fresh_from_store() {
        let (state, _dir) = create_test_state();
        let user = seed_user(&state, "alice", Role::Admin);
        let token = issue_token(&state, &user);

        assert!(authorize(&authenticate(&bearer(&token), &state).unwrap(), ADMIN_ROLES).is_ok());

        state.users.update(&user.id, |u| u.role = Role::Client);

        let auth = authenticate(&bearer(&token), &state).unwrap();
        assert_eq!(auth.role, Role::Client);
        assert!(matches!(authorize(&auth, ADMIN_ROLES), Err(AuthError::Forbidden)));
    }

    #[test]
    fn test_deleted_user_token_is_unauthenticated() {
        let (state, _dir) = create_test_state();
        let user = seed_user(&state, "alice", Role::Client);
        let token = issue_token(&state, &user);

        state.users.remove(&user.id);

        assert!(matches!(
            authenticate(&bearer(&token), &state),
            Err(AuthError::Unauthenticated)
        ));
    }

    #[test]
    fn test_authorize_role_sets() {
        let (state, _dir) = create_test_state();
        for (role, admin_ok, super_ok) in [
            (Role::Client, false, false),
            (Role::Admin, true, false),
            (Role::SuperAdmin, true, true),
        ] {
            let user = seed_user(&state, &format!("user_{}", role), role);
            let auth = authenticate(&bearer(&issue_token(&state, &user)), &state).unwrap();
            assert_eq!(authorize(&auth, ADMIN_ROLES).is_ok(), admin_ok);
            assert_eq!(authorize(&auth, SUPER_ADMIN_ROLES).is_ok(), super_ok);
        }
    }
}
