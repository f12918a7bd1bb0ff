// Centralized error handling for the auth service and its client

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Error taxonomy shared by the server responses and the client library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    Conflict,
    ValidationError,
    NotFound,
    InvalidRole,
    InvalidCredentials,
    RateLimited,
    ServerError,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::InvalidRole => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Best guess from a bare status code, for error bodies without a `code`
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthenticated,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            s if s.is_client_error() => ErrorKind::ValidationError,
            _ => ErrorKind::ServerError,
        }
    }
}

/// Errors returned by the HTTP API
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("You are not authorized to perform this action")]
    Forbidden,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRole(String),

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unauthenticated => ErrorKind::Unauthenticated,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::Validation(_) => ErrorKind::ValidationError,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::InvalidRole(_) => ErrorKind::InvalidRole,
            AuthError::RateLimited => ErrorKind::RateLimited,
            AuthError::Internal(_) => ErrorKind::ServerError,
        }
    }
}

/// Malformed or missing JSON bodies are plain validation failures
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        use crate::models::api::ErrorResponse;

        if let AuthError::Internal(e) = &self {
            error!(error = %e, "Request failed with internal error");
        }

        let kind = self.kind();

        (
            kind.status(),
            Json(ErrorResponse {
                success: false,
                error: self.to_string(),
                code: kind,
            }),
        )
            .into_response()
    }
}

/// Errors surfaced by the client-side session library
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("{message}")]
    Api { kind: ErrorKind, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Superseded by a newer session change")]
    Superseded,

    #[error("A change for this user is already in progress")]
    Busy,
}

impl ClientError {
    pub fn api(kind: ErrorKind, message: impl Into<String>) -> Self {
        ClientError::Api {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ClientError::Api { kind, .. } => Some(*kind),
            ClientError::NotAuthenticated => Some(ErrorKind::Unauthenticated),
            _ => None,
        }
    }

    /// Text shown to the user; never carries transport internals.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { kind, message } => match kind {
                ErrorKind::InvalidCredentials => "Invalid email or password".to_string(),
                ErrorKind::Unauthenticated => "Your session has expired, please log in again".to_string(),
                ErrorKind::Forbidden => "Access denied".to_string(),
                ErrorKind::ServerError => "Something went wrong, please try again".to_string(),
                _ => message.clone(),
            },
            ClientError::Transport(_) => "Unable to reach the server".to_string(),
            ClientError::Storage(_) => "Unable to access saved session".to_string(),
            ClientError::NotAuthenticated => "Please log in first".to_string(),
            ClientError::Superseded => "The session changed before the request finished".to_string(),
            ClientError::Busy => "Please wait for the current change to finish".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}
