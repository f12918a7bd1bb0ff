// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public endpoints
        .route("/health", get(crate::handlers::health::health_handler))
        .route("/auth/register", post(crate::handlers::auth::register_handler))
        .route("/auth/login", post(crate::handlers::auth::login_handler))

        // Authenticated endpoints
        .route("/auth/logout", post(crate::handlers::auth::logout_handler))
        .route(
            "/users/me",
            get(crate::handlers::users::get_me_handler)
                .patch(crate::handlers::users::update_me_handler)
                .delete(crate::handlers::users::delete_me_handler),
        )

        // Role-restricted endpoints
        .route("/users/all", get(crate::handlers::users::list_users_handler))
        .route("/users/role", patch(crate::handlers::users::change_role_handler))

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
