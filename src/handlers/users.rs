use crate::core::error::AuthError;
use crate::core::state::AppState;
use crate::guard::server::{AuthUser, RequireAdmin, RequireSuperAdmin};
use crate::models::api::{ChangeRoleRequest, DataResponse, SuccessResponse};
use crate::models::user::{ProfilePatch, PublicUser};
use crate::services::{profile, role_mutation};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use std::sync::Arc;
use tracing::debug;

/// GET /users/me
pub async fn get_me_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<DataResponse<PublicUser>>, AuthError> {
    Ok(Json(DataResponse::new(profile::get_profile(&state, &user)?)))
}

/// PATCH /users/me
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> Result<Json<DataResponse<PublicUser>>, AuthError> {
    let Json(patch) = payload?;
    let updated = profile::update_profile(&state, &user, patch)?;

    Ok(Json(DataResponse::with_message(
        updated,
        "Profile updated successfully",
    )))
}

/// DELETE /users/me
pub async fn delete_me_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<SuccessResponse>, AuthError> {
    profile::delete_profile(&state, &user)?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "Profile deleted successfully".to_string(),
    }))
}

/// List every account, oldest first
///
/// GET /users/all (admin, super_admin)
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    RequireAdmin(caller): RequireAdmin,
) -> Json<DataResponse<Vec<PublicUser>>> {
    let users: Vec<PublicUser> = state.users.list().iter().map(|u| u.to_public()).collect();
    debug!(user_id = %caller.id, count = users.len(), "Listed users");

    Json(DataResponse::new(users))
}

/// Change another account's role
///
/// PATCH /users/role (super_admin)
pub async fn change_role_handler(
    State(state): State<Arc<AppState>>,
    RequireSuperAdmin(caller): RequireSuperAdmin,
    payload: Result<Json<ChangeRoleRequest>, JsonRejection>,
) -> Result<Json<DataResponse<PublicUser>>, AuthError> {
    let Json(req) = payload?;

    let change = role_mutation::change_role(&state, &caller, &req.user_id, &req.role)?;
    let message = format!(
        "User {} role changed to {}",
        change.user.username, change.user.role
    );

    Ok(Json(DataResponse::with_message(change.user, message)))
}

#[cfg(test)]
mod tests {
    use crate::core::state::test_support::{call, create_test_state, issue_token, seed_user};
    use crate::models::role::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_me_round_trip() {
        let (state, _dir) = create_test_state();
        let alice = seed_user(&state, "alice", Role::Client);
        let token = issue_token(&state, &alice);

        let (status, body) = call(
            &state,
            "PATCH",
            "/users/me",
            Some(&token),
            Some(json!({"bio": "hello", "role": "super_admin"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["bio"], "hello");
        assert_eq!(body["data"]["role"], "client");

        let (status, body) = call(&state, "GET", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "alice");
        assert_eq!(body["data"]["bio"], "hello");
    }

    #[tokio::test]
    async fn test_delete_me_invalidates_token() {
        let (state, _dir) = create_test_state();
        let alice = seed_user(&state, "alice", Role::Client);
        let token = issue_token(&state, &alice);

        let (status, _) = call(&state, "DELETE", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&state, "GET", "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let (state, _dir) = create_test_state();
        let client = seed_user(&state, "carol", Role::Client);
        let admin = seed_user(&state, "adam", Role::Admin);

        let (status, _) = call(&state, "GET", "/users/all", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            call(&state, "GET", "/users/all", Some(&issue_token(&state, &client)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");

        let (status, body) =
            call(&state, "GET", "/users/all", Some(&issue_token(&state, &admin)), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body["data"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn test_change_role_end_to_end() {
        let (state, _dir) = create_test_state();
        let root = seed_user(&state, "root", Role::SuperAdmin);
        let carol = seed_user(&state, "carol", Role::Client);
        let root_token = issue_token(&state, &root);
        let carol_token = issue_token(&state, &carol);

        let (status, _) =
            call(&state, "GET", "/users/all", Some(&carol_token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(
            &state,
            "PATCH",
            "/users/role",
            Some(&root_token),
            Some(json!({"userId": carol.id.to_string(), "role": "admin"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "admin");
        assert_eq!(body["message"], "User carol role changed to admin");

        // Same token, new role
        let (status, _) =
            call(&state, "GET", "/users/all", Some(&carol_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_change_role_errors() {
        let (state, _dir) = create_test_state();
        let root = seed_user(&state, "root", Role::SuperAdmin);
        let admin = seed_user(&state, "adam", Role::Admin);
        let root_token = issue_token(&state, &root);

        let (status, body) = call(
            &state,
            "PATCH",
            "/users/role",
            Some(&issue_token(&state, &admin)),
            Some(json!({"userId": root.id.to_string(), "role": "client"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");

        let (status, body) = call(
            &state,
            "PATCH",
            "/users/role",
            Some(&root_token),
            Some(json!({"userId": admin.id.to_string(), "role": "owner"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_role");

        let (status, body) = call(
            &state,
            "PATCH",
            "/users/role",
            Some(&root_token),
            Some(json!({"userId": uuid::Uuid::new_v4().to_string(), "role": "admin"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");

        let (status, body) = call(
            &state,
            "PATCH",
            "/users/role",
            Some(&root_token),
            Some(json!({"userId": root.id.to_string(), "role": "client"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_role");
        assert_eq!(state.users.get(&root.id).unwrap().role, Role::SuperAdmin);
    }
}
