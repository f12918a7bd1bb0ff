use crate::core::error::AuthError;
use axum::http::Uri;

pub async fn fallback_handler(uri: Uri) -> AuthError {
    AuthError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use crate::core::state::test_support::{call, create_test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (state, _dir) = create_test_state();
        let (status, body) = call(&state, "GET", "/announce", None, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "not_found");
    }
}
