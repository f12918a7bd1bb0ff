use crate::core::error::{ClientError, ErrorKind};
use crate::models::api::{
    ChangeRoleRequest, DataResponse, ErrorResponse, LoginRequest, RegisterRequest,
    SuccessResponse, TokenResponse,
};
use crate::models::user::{ProfilePatch, PublicUser};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Remote operations the session needs from the auth service
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, req: &RegisterRequest) -> Result<PublicUser, ClientError>;

    async fn login(&self, req: &LoginRequest) -> Result<String, ClientError>;

    async fn get_profile(&self, token: &str) -> Result<PublicUser, ClientError>;

    async fn update_profile(
        &self,
        token: &str,
        patch: &ProfilePatch,
    ) -> Result<PublicUser, ClientError>;

    async fn delete_profile(&self, token: &str) -> Result<(), ClientError>;

    async fn list_users(&self, token: &str) -> Result<Vec<PublicUser>, ClientError>;

    async fn change_role(
        &self,
        token: &str,
        user_id: &str,
        role: &str,
    ) -> Result<PublicUser, ClientError>;
}

/// `AuthApi` over HTTP
#[derive(Clone)]
pub struct HttpAuthApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Decode a success body, or turn an error body into `ClientError::Api`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let bytes = response.bytes().await?;
    match serde_json::from_slice::<ErrorResponse>(&bytes) {
        Ok(body) => Err(ClientError::api(body.code, body.error)),
        Err(_) => Err(ClientError::api(
            ErrorKind::from_status(status),
            status.canonical_reason().unwrap_or("Request failed"),
        )),
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn register(&self, req: &RegisterRequest) -> Result<PublicUser, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(req)
            .send()
            .await?;

        Ok(decode::<DataResponse<PublicUser>>(response).await?.data)
    }

    async fn login(&self, req: &LoginRequest) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(req)
            .send()
            .await?;

        Ok(decode::<TokenResponse>(response).await?.token)
    }

    async fn get_profile(&self, token: &str) -> Result<PublicUser, ClientError> {
        let response = self
            .client
            .get(self.url("/users/me"))
            .bearer_auth(token)
            .send()
            .await?;

        Ok(decode::<DataResponse<PublicUser>>(response).await?.data)
    }

    async fn update_profile(
        &self,
        token: &str,
        patch: &ProfilePatch,
    ) -> Result<PublicUser, ClientError> {
        let response = self
            .client
            .patch(self.url("/users/me"))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?;

        Ok(decode::<DataResponse<PublicUser>>(response).await?.data)
    }

    async fn delete_profile(&self, token: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url("/users/me"))
            .bearer_auth(token)
            .send()
            .await?;

        decode::<SuccessResponse>(response).await?;
        Ok(())
    }

    async fn list_users(&self, token: &str) -> Result<Vec<PublicUser>, ClientError> {
        let response = self
            .client
            .get(self.url("/users/all"))
            .bearer_auth(token)
            .send()
            .await?;

        Ok(decode::<DataResponse<Vec<PublicUser>>>(response).await?.data)
    }

    async fn change_role(
        &self,
        token: &str,
        user_id: &str,
        role: &str,
    ) -> Result<PublicUser, ClientError> {
        let body = ChangeRoleRequest {
            user_id: user_id.to_string(),
            role: role.to_string(),
        };
        let response = self
            .client
            .patch(self.url("/users/role"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        Ok(decode::<DataResponse<PublicUser>>(response).await?.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::SessionContext;
    use crate::client::storage::{MemoryTokenStorage, TokenStorage};
    use crate::core::routes::build_router;
    use crate::core::state::test_support::{create_test_state, seed_user, TEST_PASSWORD};
    use crate::models::role::Role;
    use tokio::net::TcpListener;

    /// Serve the real router on an ephemeral port
    async fn spawn_server() -> (String, std::sync::Arc<crate::core::state::AppState>, tempfile::TempDir) {
        let (state, dir) = create_test_state();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = build_router(std::sync::Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), state, dir)
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let api = HttpAuthApi::new("http://localhost:5009/").unwrap();
        assert_eq!(api.url("/users/me"), "http://localhost:5009/users/me");
    }

    #[tokio::test]
    async fn test_error_codes_survive_the_wire() {
        let (base, _state, _dir) = spawn_server().await;
        let api = HttpAuthApi::new(base).unwrap();

        let err = api
            .login(&LoginRequest {
                email: "ghost@x.com".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidCredentials));

        let err = api.get_profile("not-a-token").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Unauthenticated));
    }

    #[tokio::test]
    async fn test_session_against_live_server() {
        let (base, state, _dir) = spawn_server().await;
        let storage = MemoryTokenStorage::new();
        let session = SessionContext::new(HttpAuthApi::new(base.clone()).unwrap(), storage.clone());

        session.initialize().await;
        assert!(!session.snapshot().is_authenticated);

        let user = session
            .register("alice", "alice@x.com", TEST_PASSWORD)
            .await
            .unwrap();
        assert_eq!(user.role, Role::Client);
        assert!(storage.load().unwrap().is_some());

        let err = session
            .api()
            .list_users(&session.token().unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Forbidden));

        // A super_admin promotes alice; her existing token picks it up
        let root = seed_user(&state, "root", Role::SuperAdmin);
        let root_api = HttpAuthApi::new(base).unwrap();
        let root_token = root_api
            .login(&LoginRequest {
                email: root.email.clone(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap();
        let promoted = root_api
            .change_role(&root_token, &user.id.to_string(), "admin")
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let listed = session
            .api()
            .list_users(&session.token().unwrap())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);

        // A fresh page load restores the session from storage
        let reloaded = SessionContext::new(session.api().clone(), storage.clone());
        reloaded.initialize().await;
        let snapshot = reloaded.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.user.unwrap().role, Role::Admin);

        session.delete_profile().await.unwrap();
        assert!(storage.load().unwrap().is_none());
        assert!(state.users.find_by_email("alice@x.com").is_none());
    }
}
