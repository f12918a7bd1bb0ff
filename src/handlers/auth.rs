use crate::core::error::AuthError;
use crate::core::state::AppState;
use crate::guard::server::AuthUser;
use crate::models::api::{
    DataResponse, LoginRequest, RegisterRequest, SuccessResponse, TokenResponse,
};
use crate::models::user::PublicUser;
use crate::services::credentials;
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;

/// Run password hashing work off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Credential task panicked")?
}

/// Create a client account
///
/// POST /auth/register
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DataResponse<PublicUser>>), AuthError> {
    let Json(req) = payload?;

    let user = run_blocking(move || credentials::register(&state, req)).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(user, "User registered successfully")),
    ))
}

/// Exchange credentials for a bearer token
///
/// POST /auth/login
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AuthError> {
    let Json(req) = payload?;

    let token = run_blocking(move || credentials::login(&state, req)).await?;

    Ok(Json(TokenResponse {
        success: true,
        token,
    }))
}

/// POST /auth/logout
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<SuccessResponse>, AuthError> {
    credentials::logout(&state, &user.token)?;

    Ok(Json(SuccessResponse {
        success: true,
        message: "Logged out successfully".to_string(),
    }))
}
